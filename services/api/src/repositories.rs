//! Repositories for database operations

pub mod analytics;
pub mod property;
pub mod testimonial;

pub use analytics::AnalyticsRepository;
pub use property::PropertyRepository;
pub use testimonial::TestimonialRepository;
