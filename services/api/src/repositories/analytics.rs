//! Page-view log and dashboard aggregates

use anyhow::Result;
use chrono::{NaiveDate, TimeZone, Utc};
use sqlx::PgPool;

use crate::models::analytics::{
    Dashboard, LabelCount, NewPageView, PathCount, label_roles, window_start, zero_fill,
};

const TOP_PAGES: i64 = 10;
const TOP_CITIES: i64 = 10;

/// Analytics repository for database operations
#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: PgPool,
}

impl AnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a page view
    pub async fn record(&self, view: &NewPageView) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO page_views (path, user_id, user_role, ip, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&view.path)
        .bind(view.user_id)
        .bind(&view.user_role)
        .bind(&view.ip)
        .bind(&view.user_agent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Aggregate the dashboard for the `days` days ending `today` (UTC)
    pub async fn dashboard(&self, today: NaiveDate, days: u32) -> Result<Dashboard> {
        let start = window_start(today, days);
        let since = Utc.from_utc_datetime(&start.and_time(chrono::NaiveTime::MIN));

        let daily: Vec<(NaiveDate, i64)> = sqlx::query_as(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*)
            FROM page_views
            WHERE created_at >= $1
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let top_pages: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT path, COUNT(*) AS views
            FROM page_views
            WHERE created_at >= $1
            GROUP BY path
            ORDER BY views DESC, path
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(TOP_PAGES)
        .fetch_all(&self.pool)
        .await?;

        let by_role: Vec<(Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT user_role, COUNT(*)
            FROM page_views
            WHERE created_at >= $1
            GROUP BY user_role
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let (total_views, unique_visitors): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(DISTINCT ip)
            FROM page_views
            WHERE created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let properties_by_type = self
            .property_breakdown(
                "SELECT property_type, COUNT(*) AS n FROM properties \
                 GROUP BY property_type ORDER BY n DESC, property_type",
            )
            .await?;
        let properties_by_status = self
            .property_breakdown(
                "SELECT status, COUNT(*) AS n FROM properties \
                 GROUP BY status ORDER BY n DESC, status",
            )
            .await?;

        let properties_by_city: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT city, COUNT(*) AS n FROM properties
            GROUP BY city
            ORDER BY n DESC, city
            LIMIT $1
            "#,
        )
        .bind(TOP_CITIES)
        .fetch_all(&self.pool)
        .await?;

        let (total_properties, total_users, total_testimonials, average_rating): (
            i64,
            i64,
            i64,
            Option<f64>,
        ) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM properties),
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM testimonials),
                (SELECT AVG(rating)::float8 FROM testimonials WHERE approved)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(Dashboard {
            days,
            views_per_day: zero_fill(&daily, start, days),
            top_pages: top_pages
                .into_iter()
                .map(|(path, count)| PathCount { path, count })
                .collect(),
            views_by_role: label_roles(by_role),
            total_views,
            unique_visitors,
            properties_by_type,
            properties_by_status,
            properties_by_city: properties_by_city.into_iter().map(LabelCount::from).collect(),
            total_properties,
            total_users,
            total_testimonials,
            average_rating: average_rating.map(|r| (r * 100.0).round() / 100.0),
        })
    }

    async fn property_breakdown(&self, sql: &'static str) -> Result<Vec<LabelCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(LabelCount::from).collect())
    }
}
