// Vision translation logic
// Author: kelexine (https://github.com/kelexine)

use super::models::{validate_image_size, ImageFormat, ImagePayload};
use crate::error::{CaptionError, Result};

/// Translate an image payload into the inline `data:` URL the vision model accepts.
///
/// Payloads that already carry a `data:` header are passed through untouched;
/// bare base64 gets a MIME prefix sniffed from its leading characters.
pub fn to_data_url(image: &ImagePayload) -> Result<String> {
    if image.base64_body().is_empty() {
        return Err(CaptionError::InvalidImage("image payload is empty".to_string()));
    }

    validate_image_size(image.decoded_len()).map_err(CaptionError::InvalidImage)?;

    if image.is_data_url() {
        return Ok(image.as_str().to_string());
    }

    let format = ImageFormat::sniff_base64(image.as_str());
    Ok(format!("data:{};base64,{}", format.mime_type(), image.as_str()))
}
