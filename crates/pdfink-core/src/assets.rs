//! Image-asset fetching seam.
//!
//! Signature stamps are fetched from an externally configured asset path.
//! The fetch is an asynchronous boundary, like document load and page
//! rasters.

use crate::raster::BoxFuture;
use std::collections::HashMap;
use thiserror::Error;

/// Asset errors.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),
    #[error("Asset decode failed: {0}")]
    Decode(String),
}

/// A fetched raster asset: encoded bytes plus pixel dimensions.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// Encoded image bytes (PNG unless stated otherwise by the fetcher).
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Capability: fetch an image asset by path.
pub trait AssetFetcher {
    fn fetch(&self, path: &str) -> BoxFuture<'_, Result<FetchedImage, AssetError>>;
}

/// In-memory asset set, for tests and embedders that bundle their assets.
#[derive(Debug, Default, Clone)]
pub struct StaticAssets {
    assets: HashMap<String, FetchedImage>,
}

impl StaticAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset under a path.
    pub fn insert(&mut self, path: impl Into<String>, image: FetchedImage) {
        self.assets.insert(path.into(), image);
    }

    /// Builder-style registration.
    pub fn with(mut self, path: impl Into<String>, image: FetchedImage) -> Self {
        self.insert(path, image);
        self
    }
}

impl AssetFetcher for StaticAssets {
    fn fetch(&self, path: &str) -> BoxFuture<'_, Result<FetchedImage, AssetError>> {
        let path = path.to_string();
        Box::pin(async move {
            self.assets
                .get(&path)
                .cloned()
                .ok_or(AssetError::NotFound(path))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::block_on;

    #[test]
    fn test_fetch_registered_asset() {
        let assets = StaticAssets::new().with(
            "img/signature.png",
            FetchedImage {
                bytes: vec![1, 2, 3],
                width: 10,
                height: 4,
            },
        );

        let image = block_on(assets.fetch("img/signature.png")).unwrap();
        assert_eq!(image.width, 10);
        assert_eq!(image.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_fetch_missing_asset() {
        let assets = StaticAssets::new();
        let result = block_on(assets.fetch("img/missing.png"));
        assert!(matches!(result, Err(AssetError::NotFound(_))));
    }
}
