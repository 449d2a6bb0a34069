//! Property listings

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, postgres::PgRow};
use uuid::Uuid;

/// Kind of property on offer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    House,
    Apartment,
    Condo,
    Townhouse,
    Villa,
    Land,
    Commercial,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "house",
            PropertyType::Apartment => "apartment",
            PropertyType::Condo => "condo",
            PropertyType::Townhouse => "townhouse",
            PropertyType::Villa => "villa",
            PropertyType::Land => "land",
            PropertyType::Commercial => "commercial",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "house" => Ok(PropertyType::House),
            "apartment" => Ok(PropertyType::Apartment),
            "condo" => Ok(PropertyType::Condo),
            "townhouse" => Ok(PropertyType::Townhouse),
            "villa" => Ok(PropertyType::Villa),
            "land" => Ok(PropertyType::Land),
            "commercial" => Ok(PropertyType::Commercial),
            other => Err(format!("Unknown property type: {}", other)),
        }
    }
}

/// Publication state of a listing. Only `Active` listings are public.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Active,
    Pending,
    Archived,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Active => "active",
            PropertyStatus::Pending => "pending",
            PropertyStatus::Archived => "archived",
        }
    }
}

impl FromStr for PropertyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(PropertyStatus::Active),
            "pending" => Ok(PropertyStatus::Pending),
            "archived" => Ok(PropertyStatus::Archived),
            other => Err(format!("Unknown status: {}", other)),
        }
    }
}

/// Property entity. `price` is in minor currency units.
#[derive(Debug, Clone, Serialize)]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub state: String,
    pub city: String,
    pub location: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub price: i64,
    pub beds: Option<i32>,
    pub baths: Option<i32>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub featured: bool,
    pub status: PropertyStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list matching [`Property::from_row`]
pub const PROPERTY_COLUMNS: &str = "id, title, description, state, city, location, property_type, \
     price, beds, baths, images, videos, featured, status, created_by, created_at, updated_at";

impl Property {
    pub fn from_row(row: &PgRow) -> anyhow::Result<Self> {
        let property_type: String = row.try_get("property_type")?;
        let status: String = row.try_get("status")?;
        Ok(Property {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            state: row.try_get("state")?,
            city: row.try_get("city")?,
            location: row.try_get("location")?,
            property_type: property_type.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            price: row.try_get("price")?,
            beds: row.try_get("beds")?,
            baths: row.try_get("baths")?,
            images: row.try_get("images")?,
            videos: row.try_get("videos")?,
            featured: row.try_get("featured")?,
            status: status.parse().map_err(|e: String| anyhow::anyhow!(e))?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Every media URL the listing references
    pub fn media_urls(&self) -> Vec<String> {
        self.images.iter().chain(self.videos.iter()).cloned().collect()
    }
}

/// Full field set for creating or replacing a listing
#[derive(Debug, Clone, Deserialize)]
pub struct NewProperty {
    pub title: String,
    pub description: String,
    pub state: String,
    pub city: String,
    pub location: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub price: i64,
    pub beds: Option<i32>,
    pub baths: Option<i32>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: PropertyStatus,
}

impl NewProperty {
    /// Trim text fields and check presence and ranges
    pub fn validate(mut self) -> Result<Self, String> {
        for (field, value) in [
            ("title", &mut self.title),
            ("description", &mut self.description),
            ("state", &mut self.state),
            ("city", &mut self.city),
            ("location", &mut self.location),
        ] {
            *value = value.trim().to_string();
            if value.is_empty() {
                return Err(format!("{} is required", field));
            }
        }

        if self.title.chars().count() > 200 {
            return Err("title must be at most 200 characters long".to_string());
        }

        if self.price < 0 {
            return Err("price must not be negative".to_string());
        }

        if self.beds.is_some_and(|b| b < 0) || self.baths.is_some_and(|b| b < 0) {
            return Err("beds and baths must not be negative".to_string());
        }

        self.images.retain(|url| !url.trim().is_empty());
        self.videos.retain(|url| !url.trim().is_empty());

        Ok(self)
    }
}

/// Listing filters; all optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyQuery {
    pub status: Option<PropertyStatus>,
    #[serde(rename = "type")]
    pub property_type: Option<PropertyType>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub featured: Option<bool>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_beds: Option<i32>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PropertyQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(12).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.limit())
    }
}

/// Featured flag toggle from the admin console
#[derive(Debug, Deserialize)]
pub struct FeaturedUpdate {
    pub featured: bool,
}
