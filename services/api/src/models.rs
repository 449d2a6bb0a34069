//! API models for request and response payloads

use serde::{Deserialize, Serialize};

pub mod analytics;
pub mod property;
pub mod testimonial;

/// Provider deletion request for an uploaded asset
#[derive(Debug, Deserialize)]
pub struct DeleteMediaRequest {
    pub url: String,
}

/// Page-view beacon sent by the site on navigation
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub path: String,
}

/// One page of a listing query
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}
