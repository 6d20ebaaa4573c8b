//! Image payload handling for the vision request.
//!
//! This module turns caller-supplied images into the inline data URLs the
//! OpenAI vision model accepts. It includes MIME sniffing from base64
//! prefixes and size validation.
//!
//! # Submodules
//!
//! - `models`: The image payload type, formats and validation constraints.
//! - `translation`: Conversion of payloads into request image references.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod models;
pub mod translation;

pub use models::{ImageFormat, ImagePayload};
pub use translation::to_data_url;
