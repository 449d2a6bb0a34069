//! Application state shared across handlers

use auth::AuthState;
use common::cache::RedisPool;
use media::CloudinaryClient;
use sqlx::PgPool;

use crate::{
    configuration::Settings,
    repositories::{AnalyticsRepository, PropertyRepository, TestimonialRepository},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis: RedisPool,
    pub settings: Settings,
    pub auth: AuthState,
    pub property_repository: PropertyRepository,
    pub testimonial_repository: TestimonialRepository,
    pub analytics_repository: AnalyticsRepository,
    /// `None` when Cloudinary credentials are not configured
    pub media: Option<CloudinaryClient>,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        redis: RedisPool,
        settings: Settings,
        auth: AuthState,
        media: Option<CloudinaryClient>,
    ) -> Self {
        Self {
            property_repository: PropertyRepository::new(db_pool.clone()),
            testimonial_repository: TestimonialRepository::new(db_pool.clone()),
            analytics_repository: AnalyticsRepository::new(db_pool.clone()),
            db_pool,
            redis,
            settings,
            auth,
            media,
        }
    }
}
