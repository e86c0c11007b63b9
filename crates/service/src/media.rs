use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Uploaded image bytes together with the content type they are served with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredImage {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl StoredImage {
    /// Accepts the upload only if it decodes as an image; the content type is
    /// taken from the detected format, never from the client.
    pub fn from_upload(data: Vec<u8>) -> Result<Self, ServiceError> {
        let format = image::guess_format(&data)
            .map_err(|_| ServiceError::InvalidImage("unrecognised image format".to_string()))?;

        let content_type = match format {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Bmp => "image/bmp",
            other => {
                return Err(ServiceError::InvalidImage(format!(
                    "unsupported image format {other:?}"
                )))
            }
        };

        image::load_from_memory_with_format(&data, format)
            .map_err(|e| ServiceError::InvalidImage(e.to_string()))?;

        Ok(Self {
            content_type: content_type.to_string(),
            data,
        })
    }
}

#[cfg(test)]
pub(crate) fn tiny_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::new_rgb8(2, 2)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    bytes
}
