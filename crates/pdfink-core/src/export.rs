//! Flattening and export seams.
//!
//! Producing a downloadable document is delegated to two external
//! capabilities: a [`PageFlattener`] that composites one surface into a
//! full-page raster, and a [`DocumentExporter`] that collects those rasters
//! into a multi-page output document.

use crate::raster::PageBitmap;
use crate::surface::PageSurface;
use thiserror::Error;

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Flatten failed: {0}")]
    Flatten(String),
    #[error("Image encode failed: {0}")]
    Encode(String),
    #[error("Document assembly failed: {0}")]
    Document(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability: composite a surface's background and annotation objects into
/// one bitmap, pixel-for-pixel the size of the background.
pub trait PageFlattener {
    fn flatten(&self, surface: &PageSurface) -> Result<PageBitmap, ExportError>;
}

/// Capability: a multi-page image document builder.
///
/// A fresh exporter starts with a single default page, so the first surface
/// reuses it; every later surface is preceded by an explicit [`add_page`]
/// call.
///
/// [`add_page`]: DocumentExporter::add_page
pub trait DocumentExporter {
    /// Append a new output page after the current one and make it current.
    fn add_page(&mut self) -> Result<(), ExportError>;

    /// Place a full-page image on the current output page.
    fn add_image(&mut self, bitmap: &PageBitmap) -> Result<(), ExportError>;

    /// Write the document under the given file name.
    fn save(&mut self, file_name: &str) -> Result<(), ExportError>;
}
