//! HTTP backend of the estate site
//!
//! Property catalog, testimonials, page-view analytics and media uploads,
//! plus the admin console routes over all of them. Authentication routes
//! come from the `auth` crate and are merged into the same router.

pub mod configuration;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod startup;
pub mod state;

pub use state::AppState;
