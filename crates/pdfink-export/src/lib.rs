//! pdfink Export Library
//!
//! lopdf-backed implementation of the document-exporter capability: each
//! flattened surface becomes a full-page image on its own page of the
//! output PDF.

mod pdf;

pub use pdf::PdfExporter;
