//! Media storage for listing photos and videos
//!
//! Files are pushed to Cloudinary and referenced afterwards only by their
//! delivery URL, which is also what deletion starts from.

pub mod cloudinary;
pub mod error;
pub mod models;

pub use cloudinary::{CloudinaryClient, CloudinaryConfig};
pub use error::{MediaError, MediaResult};
pub use models::{MediaRef, ResourceType, UploadedMedia, removed_media};
