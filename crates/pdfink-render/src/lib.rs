//! pdfink Render Library
//!
//! CPU implementation of the page-flattening capability: composites a
//! surface's background and annotation overlay into a single RGBA bitmap.
//! Also provides PNG encode/decode helpers for page images.

mod flatten;
mod png_io;

pub use flatten::RasterFlattener;
pub use png_io::{decode_png, encode_png};
