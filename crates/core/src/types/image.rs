//! Product image blobs.
//!
//! Images are stored inline with the product record, so uploads are capped
//! at [`MAX_IMAGE_BYTES`].

/// Largest accepted image upload, in bytes.
pub const MAX_IMAGE_BYTES: usize = 1_000_000;

/// Reasons an uploaded image is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("Image should be less than 1mb in size")]
    TooLarge {
        /// Size of the rejected upload.
        size: usize,
    },
    #[error("Image upload is empty")]
    Empty,
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
}

/// An image blob together with its MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ProductImage {
    data: Vec<u8>,
    content_type: String,
}

impl ProductImage {
    /// Validate an uploaded image.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError`] if the blob is empty, larger than
    /// [`MAX_IMAGE_BYTES`], or its content type is not `image/*`.
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Result<Self, ImageError> {
        let content_type = content_type.into();
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge { size: data.len() });
        }
        if !content_type.starts_with("image/") {
            return Err(ImageError::UnsupportedType(content_type));
        }
        Ok(Self { data, content_type })
    }

    /// Rebuild an image that was already validated on upload.
    #[must_use]
    pub const fn from_stored(data: Vec<u8>, content_type: String) -> Self {
        Self { data, content_type }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, String) {
        (self.data, self.content_type)
    }
}

// Blobs are large; keep them out of logs.
impl std::fmt::Debug for ProductImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductImage")
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}
