//! Customer testimonials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

const MAX_TEXT_CHARS: usize = 2000;

/// Testimonial entity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Testimonial {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub rating: i16,
    pub text: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Public submission
#[derive(Debug, Clone, Deserialize)]
pub struct NewTestimonial {
    pub name: String,
    pub role: String,
    pub rating: i16,
    pub text: String,
}

impl NewTestimonial {
    pub fn validate(self) -> Result<Self, String> {
        let name = self.name.trim().to_string();
        let role = self.role.trim().to_string();
        let text = self.text.trim().to_string();

        if name.is_empty() || role.is_empty() || text.is_empty() {
            return Err("Name, role and text are required".to_string());
        }

        if !(1..=5).contains(&self.rating) {
            return Err("Rating must be between 1 and 5".to_string());
        }

        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(format!(
                "Text must be at most {} characters long",
                MAX_TEXT_CHARS
            ));
        }

        Ok(Self {
            name,
            role,
            rating: self.rating,
            text,
        })
    }
}

/// Moderation toggle
#[derive(Debug, Deserialize)]
pub struct ApprovalUpdate {
    pub approved: bool,
}
