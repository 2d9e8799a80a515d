//! Image size lookup used by the image normalizer.

use thiserror::Error;

/// Pixel size of an image asset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

impl ImageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Height over width.
    pub fn aspect_ratio(&self) -> f64 {
        self.height / self.width
    }
}

/// Failure to look up an asset.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("asset lookup failed for `{path}`: {reason}")]
    Backend { path: String, reason: String },
}

/// Source of image sizes, keyed by element path (`<country>/elements/<file>`).
pub trait AssetSizeLookup {
    /// Returns the size of the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::NotFound`] if no image exists at `path`.
    fn fetch_image_size(&self, path: &str) -> Result<ImageSize, AssetError>;
}

/// An asset lookup that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAssets;

impl AssetSizeLookup for NoAssets {
    fn fetch_image_size(&self, path: &str) -> Result<ImageSize, AssetError> {
        Err(AssetError::NotFound(path.to_string()))
    }
}

impl<T: AssetSizeLookup + ?Sized> AssetSizeLookup for &T {
    fn fetch_image_size(&self, path: &str) -> Result<ImageSize, AssetError> {
        (**self).fetch_image_size(path)
    }
}
