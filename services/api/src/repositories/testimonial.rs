//! Testimonial repository for database operations

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::testimonial::{NewTestimonial, Testimonial};

const TESTIMONIAL_COLUMNS: &str = "id, name, role, rating, text, approved, created_at";

/// Testimonial repository for database operations
#[derive(Clone)]
pub struct TestimonialRepository {
    pool: PgPool,
}

impl TestimonialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store a public submission; submissions are approved on arrival
    pub async fn create(&self, new: &NewTestimonial) -> Result<Testimonial> {
        let testimonial = sqlx::query_as::<_, Testimonial>(&format!(
            r#"
            INSERT INTO testimonials (name, role, rating, text, approved)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING {TESTIMONIAL_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.role)
        .bind(new.rating)
        .bind(&new.text)
        .fetch_one(&self.pool)
        .await?;

        info!("Stored testimonial {}", testimonial.id);
        Ok(testimonial)
    }

    /// Testimonials, newest first; only approved ones unless `include_hidden`
    pub async fn list(&self, include_hidden: bool) -> Result<Vec<Testimonial>> {
        let testimonials = sqlx::query_as::<_, Testimonial>(&format!(
            r#"
            SELECT {TESTIMONIAL_COLUMNS} FROM testimonials
            WHERE approved OR $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(include_hidden)
        .fetch_all(&self.pool)
        .await?;

        Ok(testimonials)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Testimonial>> {
        let testimonial = sqlx::query_as::<_, Testimonial>(&format!(
            "SELECT {TESTIMONIAL_COLUMNS} FROM testimonials WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(testimonial)
    }

    /// Approve or hide a testimonial
    pub async fn set_approved(&self, id: Uuid, approved: bool) -> Result<Option<Testimonial>> {
        info!("Setting approval of testimonial {} to {}", id, approved);

        let testimonial = sqlx::query_as::<_, Testimonial>(&format!(
            r#"
            UPDATE testimonials SET approved = $2
            WHERE id = $1
            RETURNING {TESTIMONIAL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(approved)
        .fetch_optional(&self.pool)
        .await?;

        Ok(testimonial)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM testimonials WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
