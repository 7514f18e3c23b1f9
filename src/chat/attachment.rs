//! Inline images
//!
//! Photos attached by the user and visualizations returned by the backend.
//! Images cross the backend boundary base64-encoded; any data-URI prefix is
//! stripped first. User attachments are always sent as JPEG.

use crate::error::AppError;
use crate::gemini::types::Part;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Serialize, Serializer};

/// Upload limit for attached photos (5 MB)
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// MIME type assumed for user attachments
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Image bytes together with their MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineImage {
    /// MIME type, e.g. "image/jpeg"
    pub mime_type: String,
    /// Raw image bytes (serialized as base64)
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
}

#[allow(clippy::ptr_arg)] // signature dictated by serde(serialize_with)
fn serialize_base64<S: Serializer>(data: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

/// Strip a `data:<mime>;base64,` prefix if present
pub fn strip_data_uri_prefix(encoded: &str) -> &str {
    let trimmed = encoded.trim();
    if trimmed.starts_with("data:") {
        if let Some((_, payload)) = trimmed.split_once(',') {
            return payload;
        }
    }
    trimmed
}

impl InlineImage {
    /// Accept a photo picked by the user
    ///
    /// # Errors
    /// Returns `AttachmentTooLarge` above [`MAX_ATTACHMENT_BYTES`].
    pub fn from_upload(data: Vec<u8>) -> Result<Self, AppError> {
        check_upload_size(data.len())?;
        Ok(Self {
            mime_type: DEFAULT_IMAGE_MIME.to_string(),
            data,
        })
    }

    /// Wrap bytes returned by the backend
    pub fn generated(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Base64 encoding of the bytes
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// Inline part for a multimodal user turn
    pub fn to_part(&self) -> Part {
        Part::inline(DEFAULT_IMAGE_MIME, self.to_base64())
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image has no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reject uploads above the limit before reading them
pub fn check_upload_size(size: usize) -> Result<(), AppError> {
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AppError::AttachmentTooLarge {
            size,
            limit: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(())
}
