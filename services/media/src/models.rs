//! Media references and upload results

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::MediaError;

/// Cloudinary resource kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Video,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
        }
    }

    /// Anything that is not declared as video is uploaded as an image.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.trim().to_ascii_lowercase().starts_with("video/") {
            ResourceType::Video
        } else {
            ResourceType::Image
        }
    }

    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "image" => Some(ResourceType::Image),
            "video" => Some(ResourceType::Video),
            _ => None,
        }
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
    pub resource_type: ResourceType,
}

/// Asset reference recovered from a delivery URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub resource_type: ResourceType,
    pub public_id: String,
}

/// Host serving Cloudinary deliveries
pub const DELIVERY_HOST: &str = "res.cloudinary.com";

impl MediaRef {
    /// Parse a delivery URL of `cloud_name`, such as
    /// `https://res.cloudinary.com/demo/image/upload/c_fill,w_300/v1712/listings/a1.jpg`.
    ///
    /// Transformation segments are only recognised in front of a version
    /// segment; everything after the version is the public id (minus the
    /// extension). Without a version the whole path after `upload` is the
    /// public id.
    pub fn from_url(raw: &str, cloud_name: &str) -> Result<Self, MediaError> {
        let invalid = || MediaError::InvalidUrl(raw.to_string());

        let url = Url::parse(raw).map_err(|_| invalid())?;
        if url.host_str() != Some(DELIVERY_HOST) {
            return Err(invalid());
        }
        let segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|s| !s.is_empty())
            .collect();

        let [cloud, kind, "upload", rest @ ..] = segments.as_slice() else {
            return Err(invalid());
        };
        if *cloud != cloud_name {
            return Err(invalid());
        }
        let resource_type = ResourceType::parse(kind).ok_or_else(invalid)?;

        let id_parts = match rest.iter().position(|s| is_version(s)) {
            Some(v) if rest[..v].iter().all(|s| is_transformation(s)) => &rest[v + 1..],
            _ => rest,
        };

        let (last, dirs) = id_parts.split_last().ok_or_else(invalid)?;
        let stem = match last.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => *last,
        };

        let mut public_id = dirs.join("/");
        if !public_id.is_empty() {
            public_id.push('/');
        }
        public_id.push_str(stem);

        Ok(MediaRef {
            resource_type,
            public_id,
        })
    }
}

fn is_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

/// Transformation parameter keys Cloudinary accepts in delivery URLs
const TRANSFORMATION_KEYS: &[&str] = &[
    "a", "ac", "af", "ar", "b", "bo", "c", "co", "cs", "d", "dl", "dn", "dpr", "du", "e", "eo",
    "f", "fl", "fn", "fps", "g", "h", "ki", "l", "o", "p", "pg", "q", "r", "so", "sp", "t", "u",
    "vc", "vs", "w", "x", "y", "z",
];

fn is_transformation(segment: &str) -> bool {
    segment.split(',').all(|part| {
        part.split_once('_')
            .map(|(key, value)| TRANSFORMATION_KEYS.contains(&key) && !value.is_empty())
            .unwrap_or(false)
    })
}

/// URLs present in `old` that no longer appear in `new`, in their original
/// order and without repeats.
pub fn removed_media(old: &[String], new: &[String]) -> Vec<String> {
    let mut removed: Vec<String> = Vec::new();
    for url in old {
        if !new.contains(url) && !removed.contains(url) {
            removed.push(url.clone());
        }
    }
    removed
}
