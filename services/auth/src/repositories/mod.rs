//! Database access for users, provider accounts and sessions

pub mod account;
pub mod session;
pub mod user;

pub use session::SessionRepository;
pub use user::UserRepository;
