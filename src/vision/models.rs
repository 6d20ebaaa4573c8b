// Vision models and types
// Author: kelexine (https://github.com/kelexine)

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Sniff the format from the leading characters of base64 data.
    ///
    /// These prefixes are the base64 encodings of each format's magic bytes.
    /// Anything unrecognised is sent as JPEG.
    pub fn sniff_base64(data: &str) -> Self {
        if data.starts_with("/9j/") {
            ImageFormat::Jpeg
        } else if data.starts_with("iVBOR") {
            ImageFormat::Png
        } else if data.starts_with("R0lG") {
            ImageFormat::Gif
        } else if data.starts_with("UklGR") {
            ImageFormat::WebP
        } else {
            ImageFormat::Jpeg
        }
    }
}

/// Validation limits
pub const MAX_IMAGE_SIZE_BYTES: usize = 20 * 1024 * 1024; // 20MB (OpenAI limit)

/// Validate image data size
pub fn validate_image_size(data_len: usize) -> Result<(), String> {
    if data_len > MAX_IMAGE_SIZE_BYTES {
        return Err(format!(
            "Image size {} bytes exceeds maximum of {} bytes (20MB)",
            data_len, MAX_IMAGE_SIZE_BYTES
        ));
    }
    Ok(())
}

/// An image handed to the orchestrator.
///
/// Holds either bare base64 or a complete `data:` URL. The payload is never
/// persisted; only analysis results are cached.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImagePayload {
    data: String,
}

// Base64 bodies are huge; keep them out of logs
impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("len", &self.data.len())
            .field("prefix", &self.data.chars().take(16).collect::<String>())
            .finish()
    }
}

impl ImagePayload {
    /// Wrap base64 data or a `data:` URL as-is.
    pub fn from_base64(data: impl Into<String>) -> Self {
        Self {
            data: data.into().trim().to_string(),
        }
    }

    /// Base64-encode raw image bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    /// Stable id derived from the image body, usable as a cache `image_id`.
    pub fn content_id(&self) -> String {
        let digest = Sha256::digest(self.base64_body().as_bytes());
        hex::encode(&digest[..12])
    }

    pub fn is_data_url(&self) -> bool {
        self.data.starts_with("data:")
    }

    /// The base64 body, without any `data:...;base64,` header.
    pub fn base64_body(&self) -> &str {
        if self.is_data_url() {
            self.data
                .split_once(',')
                .map(|(_, body)| body)
                .unwrap_or_default()
        } else {
            &self.data
        }
    }

    /// Approximate decoded size in bytes, computed without decoding.
    pub fn decoded_len(&self) -> usize {
        let body = self.base64_body();
        let padding = body.chars().rev().take_while(|c| *c == '=').count();
        ((body.len() / 4) * 3 + (body.len() % 4).saturating_sub(1)).saturating_sub(padding.min(2))
    }
}
