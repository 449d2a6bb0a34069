//! Property repository for database operations

use anyhow::Result;
use media::removed_media;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Page,
    property::{NewProperty, PROPERTY_COLUMNS, Property, PropertyQuery, PropertyStatus},
};

/// Append the `WHERE` clause for `query` to `builder`.
///
/// `status` overrides whatever the query asks for; the public catalog
/// passes `Some(Active)`.
fn push_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    query: &'a PropertyQuery,
    status: Option<PropertyStatus>,
) {
    builder.push(" WHERE TRUE");

    if let Some(status) = status.or(query.status) {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(property_type) = query.property_type {
        builder
            .push(" AND property_type = ")
            .push_bind(property_type.as_str());
    }
    if let Some(city) = query.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        builder.push(" AND lower(city) = lower(").push_bind(city).push(")");
    }
    if let Some(state) = query.state.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        builder.push(" AND lower(state) = lower(").push_bind(state).push(")");
    }
    if let Some(featured) = query.featured {
        builder.push(" AND featured = ").push_bind(featured);
    }
    if let Some(min_price) = query.min_price {
        builder.push(" AND price >= ").push_bind(min_price);
    }
    if let Some(max_price) = query.max_price {
        builder.push(" AND price <= ").push_bind(max_price);
    }
    if let Some(min_beds) = query.min_beds {
        builder.push(" AND beds >= ").push_bind(min_beds);
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR location ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Escape `LIKE` wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Property repository for database operations
#[derive(Clone)]
pub struct PropertyRepository {
    pool: PgPool,
}

impl PropertyRepository {
    /// Create a new property repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a listing owned by `created_by`
    pub async fn create(&self, new: &NewProperty, created_by: Uuid) -> Result<Property> {
        info!("Creating property '{}' for user {}", new.title, created_by);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO properties
                (title, description, state, city, location, property_type, price, beds, baths,
                 images, videos, featured, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.state)
        .bind(&new.city)
        .bind(&new.location)
        .bind(new.property_type.as_str())
        .bind(new.price)
        .bind(new.beds)
        .bind(new.baths)
        .bind(&new.images)
        .bind(&new.videos)
        .bind(new.featured)
        .bind(new.status.as_str())
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Property::from_row(&row)
    }

    /// Replace every editable field of a listing.
    ///
    /// Returns the updated listing and the media URLs it no longer
    /// references, or `None` when the listing does not exist.
    pub async fn update(
        &self,
        id: Uuid,
        new: &NewProperty,
    ) -> Result<Option<(Property, Vec<String>)>> {
        let mut tx = self.pool.begin().await?;

        let old = sqlx::query(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(old) = old.as_ref().map(Property::from_row).transpose()? else {
            return Ok(None);
        };

        let row = sqlx::query(&format!(
            r#"
            UPDATE properties SET
                title = $2, description = $3, state = $4, city = $5, location = $6,
                property_type = $7, price = $8, beds = $9, baths = $10, images = $11,
                videos = $12, featured = $13, status = $14, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.state)
        .bind(&new.city)
        .bind(&new.location)
        .bind(new.property_type.as_str())
        .bind(new.price)
        .bind(new.beds)
        .bind(new.baths)
        .bind(&new.images)
        .bind(&new.videos)
        .bind(new.featured)
        .bind(new.status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let updated = Property::from_row(&row)?;
        let removed = removed_media(&old.media_urls(), &updated.media_urls());
        info!(
            "Updated property {} ({} media files dropped)",
            id,
            removed.len()
        );

        Ok(Some((updated, removed)))
    }

    /// Set or clear the featured flag
    pub async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Option<Property>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE properties SET featured = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(featured)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Property::from_row).transpose()
    }

    /// Delete a listing and return the media URLs it referenced
    pub async fn delete(&self, id: Uuid) -> Result<Option<Vec<String>>> {
        info!("Deleting property {}", id);

        let row = sqlx::query(&format!(
            "DELETE FROM properties WHERE id = $1 RETURNING {PROPERTY_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .as_ref()
            .map(Property::from_row)
            .transpose()?
            .map(|property| property.media_urls()))
    }

    /// Find a listing by ID, optionally only when it has `status`
    pub async fn find_by_id(
        &self,
        id: Uuid,
        status: Option<PropertyStatus>,
    ) -> Result<Option<Property>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {PROPERTY_COLUMNS} FROM properties
            WHERE id = $1 AND ($2::text IS NULL OR status = $2)
            "#
        ))
        .bind(id)
        .bind(status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Property::from_row).transpose()
    }

    /// Filtered page of listings, newest first
    pub async fn list(
        &self,
        query: &PropertyQuery,
        status: Option<PropertyStatus>,
    ) -> Result<Page<Property>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM properties");
        push_filters(&mut count, query, status);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties"
        ));
        push_filters(&mut select, query, status);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(query.limit()))
            .push(" OFFSET ")
            .push_bind(query.offset());

        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(Property::from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            page: query.page(),
            limit: query.limit(),
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::property::PropertyType;

    fn sql(query: &PropertyQuery, status: Option<PropertyStatus>) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM properties");
        push_filters(&mut builder, query, status);
        builder.sql().to_string()
    }

    #[test]
    fn empty_query_has_no_conditions() {
        assert_eq!(
            sql(&PropertyQuery::default(), None),
            "SELECT COUNT(*) FROM properties WHERE TRUE"
        );
    }

    #[test]
    fn forced_status_wins_over_requested_status() {
        let query = PropertyQuery {
            status: Some(PropertyStatus::Archived),
            ..Default::default()
        };
        let text = sql(&query, Some(PropertyStatus::Active));
        assert_eq!(text.matches("status = ").count(), 1);
    }

    #[test]
    fn filters_bind_in_order() {
        let query = PropertyQuery {
            property_type: Some(PropertyType::House),
            city: Some(" Lekki ".to_string()),
            state: Some("Lagos".to_string()),
            featured: Some(true),
            min_price: Some(100),
            search: Some("pool".to_string()),
            ..Default::default()
        };
        assert_eq!(
            sql(&query, Some(PropertyStatus::Active)),
            "SELECT COUNT(*) FROM properties WHERE TRUE AND status = $1 AND property_type = $2 \
             AND lower(city) = lower($3) AND lower(state) = lower($4) AND featured = $5 \
             AND price >= $6 AND (title ILIKE $7 OR location ILIKE $8)"
        );
    }

    #[test]
    fn blank_text_filters_are_ignored() {
        let query = PropertyQuery {
            city: Some("   ".to_string()),
            search: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(sql(&query, None), "SELECT COUNT(*) FROM properties WHERE TRUE");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
