//! Authentication models

pub mod account;
pub mod role;
pub mod session;
pub mod user;

// Re-export for convenience
pub use account::Account;
pub use role::Role;
pub use session::{IssuedSession, Session};
pub use user::{LoginCredentials, NewUser, ProviderProfile, USER_COLUMNS, User};
