//! Cloudinary upload API client
//!
//! Requests are signed with the account secret: every parameter except the
//! file, the API key and the signature itself is sorted by name, joined as
//! `k=v&k=v`, the secret is appended and the SHA-256 digest is sent along
//! with `signature_algorithm=sha256`.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};
use crate::models::{MediaRef, ResourceType, UploadedMedia};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

/// Cloudinary account configuration
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Folder new assets are placed in
    pub folder: String,
    /// Size of each part of a chunked video upload, in bytes
    pub chunk_size: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// API origin, overridable for tests
    pub api_base: String,
}

impl CloudinaryConfig {
    /// Create a new CloudinaryConfig from environment variables
    ///
    /// # Environment Variables
    /// - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` (required)
    /// - `CLOUDINARY_FOLDER` (default: "real-estate")
    /// - `CLOUDINARY_CHUNK_SIZE` in bytes (default: 6000000)
    /// - `CLOUDINARY_TIMEOUT` in seconds (default: 120)
    /// - `CLOUDINARY_API_BASE` (default: "https://api.cloudinary.com")
    pub fn from_env() -> MediaResult<Self> {
        let required = |name: &str| {
            std::env::var(name)
                .map_err(|_| MediaError::Configuration(format!("{} environment variable not set", name)))
        };

        let chunk_size = std::env::var("CLOUDINARY_CHUNK_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|size: &usize| *size > 0)
            .unwrap_or(6_000_000);

        let timeout_secs = std::env::var("CLOUDINARY_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        Ok(Self {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            api_key: required("CLOUDINARY_API_KEY")?,
            api_secret: required("CLOUDINARY_API_SECRET")?,
            folder: std::env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "real-estate".to_string()),
            chunk_size,
            timeout_secs,
            api_base: std::env::var("CLOUDINARY_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Cloudinary client
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> MediaResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    /// Upload a file and return its public URL.
    ///
    /// Videos go through the chunked protocol; a small video is simply a
    /// single chunk.
    pub async fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        content_type: &str,
    ) -> MediaResult<UploadedMedia> {
        if bytes.is_empty() {
            return Err(MediaError::EmptyUpload);
        }

        let resource_type = ResourceType::from_content_type(content_type);
        info!(
            "Uploading {} ({} bytes) as {}",
            file_name,
            bytes.len(),
            resource_type.as_str()
        );

        let mut params = BTreeMap::new();
        params.insert("folder", self.config.folder.clone());
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);

        let url = self.endpoint(resource_type, "upload");
        let response = match resource_type {
            ResourceType::Image => {
                let form = self.form(&params, &signature).part(
                    "file",
                    file_part(bytes.to_vec(), file_name, content_type)?,
                );
                let response = self.http.post(&url).multipart(form).send().await?;
                parse_upload(response).await?
            }
            ResourceType::Video => {
                let upload_id = Uuid::new_v4().simple().to_string();
                let total = bytes.len();
                let mut last = None;
                for (start, end) in chunk_ranges(total, self.config.chunk_size) {
                    let form = self.form(&params, &signature).part(
                        "file",
                        file_part(bytes[start..=end].to_vec(), file_name, content_type)?,
                    );
                    let response = self
                        .http
                        .post(&url)
                        .header("X-Unique-Upload-Id", &upload_id)
                        .header("Content-Range", format!("bytes {}-{}/{}", start, end, total))
                        .multipart(form)
                        .send()
                        .await?;
                    last = Some(parse_upload(response).await?);
                }
                last.ok_or(MediaError::EmptyUpload)?
            }
        };

        match (response.secure_url, response.public_id) {
            (Some(url), Some(public_id)) => Ok(UploadedMedia {
                url,
                public_id,
                resource_type,
            }),
            _ => Err(MediaError::Rejected {
                status: 200,
                message: "upload response did not include an asset".to_string(),
            }),
        }
    }

    /// Delete the asset behind a delivery URL.
    ///
    /// Returns `false` when the provider no longer knows the asset, which
    /// callers treat as already deleted.
    pub async fn destroy(&self, url: &str) -> MediaResult<bool> {
        let media = MediaRef::from_url(url, &self.config.cloud_name)?;
        info!(
            "Deleting {} asset {}",
            media.resource_type.as_str(),
            media.public_id
        );

        let mut params = BTreeMap::new();
        params.insert("invalidate", "true".to_string());
        params.insert("public_id", media.public_id.clone());
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);

        let response = self
            .http
            .post(self.endpoint(media.resource_type, "destroy"))
            .multipart(self.form(&params, &signature))
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: DestroyResponse = response.json().await?;

        match body.result.as_str() {
            "ok" => Ok(true),
            "not found" => {
                warn!("Asset {} was already gone", media.public_id);
                Ok(false)
            }
            other => Err(MediaError::Rejected {
                status: 200,
                message: format!("unexpected destroy result: {}", other),
            }),
        }
    }

    fn endpoint(&self, resource_type: ResourceType, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            resource_type.as_str(),
            action
        )
    }

    fn form(&self, params: &BTreeMap<&'static str, String>, signature: &str) -> Form {
        let mut form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature.to_string())
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(*key, value.clone());
        }
        form
    }
}

/// Compute the request signature for a parameter set.
pub fn sign(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Inclusive byte ranges covering `total` bytes in `chunk_size` steps.
pub fn chunk_ranges(total: usize, chunk_size: usize) -> Vec<(usize, usize)> {
    let chunk_size = chunk_size.max(1);
    (0..total)
        .step_by(chunk_size)
        .map(|start| (start, (start + chunk_size).min(total) - 1))
        .collect()
}

fn file_part(bytes: Vec<u8>, file_name: &str, content_type: &str) -> MediaResult<Part> {
    let part = Part::bytes(bytes).file_name(file_name.to_string());
    match part.mime_str(content_type) {
        Ok(part) => Ok(part),
        Err(e) => Err(MediaError::Configuration(format!(
            "invalid content type {}: {}",
            content_type, e
        ))),
    }
}

async fn check_status(response: reqwest::Response) -> MediaResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text);

    Err(MediaError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn parse_upload(response: reqwest::Response) -> MediaResult<UploadResponse> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}
