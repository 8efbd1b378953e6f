//! pdfink Core Library
//!
//! Platform-agnostic core of the pdfink PDF annotation widget: one editable
//! annotation surface per rendered page, a single global tool mode, per-page
//! serialized snapshots, and the capability seams for document rasterization,
//! page flattening, export, asset fetching, and confirmation prompts.

pub mod assets;
pub mod confirm;
pub mod error;
pub mod export;
pub mod raster;
pub mod session;
pub mod shapes;
pub mod surface;
pub mod tools;

pub use assets::{AssetError, AssetFetcher, FetchedImage, StaticAssets};
pub use confirm::{AcceptAll, Confirm, DeclineAll};
pub use error::SessionError;
pub use export::{DocumentExporter, ExportError, PageFlattener};
pub use raster::{
    BlankRenderer, BoxFuture, DocumentRenderer, DocumentSource, PageBitmap, RasterError,
    RenderedDocument,
};
pub use session::{
    AnnotationSession, Control, PageUpdatedCallback, ReadyCallback, SessionOptions, SessionState,
    SignaturePlacement, EXPORT_FILE_NAME, RENDER_SCALE,
};
pub use shapes::{SerializableColor, Shape, ShapeId, ShapeStyle, ShapeTrait};
pub use surface::{Brush, PageSurface, Snapshot, SurfaceEvent};
pub use tools::{ArrowTool, ToolKind};
