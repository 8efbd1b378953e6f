//! The annotation session: per-page surface lifecycle, global tool mode,
//! and snapshot bookkeeping.

use crate::assets::AssetFetcher;
use crate::confirm::Confirm;
use crate::error::{SessionError, SessionResult};
use crate::export::{DocumentExporter, PageFlattener};
use crate::raster::{self, DocumentRenderer, DocumentSource};
use crate::shapes::{Image, Rectangle, SerializableColor, Shape, ShapeStyle, Text};
use crate::surface::{PageSurface, Snapshot, SurfaceEvent};
use crate::tools::{ArrowTool, ToolKind};
use kurbo::Point;

/// Fixed scale factor applied to each page's native viewport.
pub const RENDER_SCALE: f64 = 1.8;

/// Text placed when no caller-supplied control provides content.
const DEFAULT_TEXT_CONTENT: &str = "Sample Text";

/// Default asset path for signature stamps.
const SIGNATURE_ASSET_PATH: &str = "img/signature.png";

/// Signature stamps are placed at 75% of their source size.
const SIGNATURE_SCALE: f64 = 0.75;

/// File name used by [`AnnotationSession::save_pdf`].
pub const EXPORT_FILE_NAME: &str = "annotated.pdf";

/// Caller-supplied context used for default text content.
#[derive(Debug, Clone, Default)]
pub struct Control {
    pub name: Option<String>,
    pub unique_id: Option<String>,
}

impl Control {
    /// The content chain: `name`, else `unique_id`, else the fixed default.
    fn text_content(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.unique_id.clone())
            .unwrap_or_else(|| DEFAULT_TEXT_CONTENT.to_string())
    }
}

/// Session-global mutable state, passed by reference into tool dispatch.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// The single global tool mode.
    pub active_tool: ToolKind,
    /// 0-based slot of the surface most recently interacted with.
    pub active_page: usize,
    /// Primary color for new objects and brushes.
    pub color: SerializableColor,
    /// Outline color for new objects.
    pub border_color: SerializableColor,
    /// Outline width for new objects.
    pub border_size: f64,
    /// Font size for new text objects.
    pub font_size: f64,
    /// Context for default text content.
    pub control: Option<Control>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            active_tool: ToolKind::default(),
            active_page: 0,
            color: SerializableColor::new(0x21, 0x21, 0x21, 255),
            border_color: SerializableColor::black(),
            border_size: 1.0,
            font_size: 16.0,
            control: None,
        }
    }
}

impl SessionState {
    /// Style stamped onto newly placed objects.
    fn object_style(&self) -> ShapeStyle {
        ShapeStyle {
            color: self.color,
            border_color: self.border_color,
            border_width: self.border_size,
        }
    }
}

/// Callback invoked synchronously after each object add:
/// `(page_number, old_snapshot, new_snapshot)`, 1-based page numbers.
pub type PageUpdatedCallback = Box<dyn FnMut(usize, &Snapshot, &Snapshot)>;

/// Callback invoked exactly once, after the last surface initializes.
pub type ReadyCallback = Box<dyn FnOnce()>;

/// Construction options.
pub struct SessionOptions {
    pub on_page_updated: Option<PageUpdatedCallback>,
    pub ready: Option<ReadyCallback>,
    /// Asset path fetched for signature stamps.
    pub signature_asset: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            on_page_updated: None,
            ready: None,
            signature_asset: SIGNATURE_ASSET_PATH.to_string(),
        }
    }
}

/// Explicit-coordinate signature placement (see
/// [`AnnotationSession::add_signature`]).
#[derive(Debug, Clone)]
pub struct SignaturePlacement {
    /// Asset path of the signature image.
    pub src: String,
    pub x_axis: f64,
    pub y_axis: f64,
}

/// The annotation session: owns one [`PageSurface`] per rendered page, the
/// global tool/config state, and the per-page snapshot cache.
///
/// Surfaces are laid out as a vertical stack in container coordinates, in
/// page order; interaction positions are container-relative and translated
/// into surface-local coordinates before dispatch.
pub struct AnnotationSession {
    container_id: String,
    surfaces: Vec<PageSurface>,
    arrow_tools: Vec<ArrowTool>,
    state: SessionState,
    on_page_updated: Option<PageUpdatedCallback>,
    signature_asset: String,
}

impl AnnotationSession {
    /// Load the document and build one surface per page.
    ///
    /// Every page is rasterized at [`RENDER_SCALE`] as its own task; tasks
    /// may finish in any order, but surface initialization waits for the
    /// completion barrier and then runs as a single pass in page order, so
    /// page numbers are assigned deterministically. `ready` fires exactly
    /// once, after the last surface is built. On load failure the error is
    /// logged, no surfaces are created, and `ready` never fires.
    pub async fn open(
        container_id: &str,
        source: DocumentSource,
        renderer: &dyn DocumentRenderer,
        mut options: SessionOptions,
    ) -> SessionResult<Self> {
        let document = match renderer.open(source).await {
            Ok(document) => document,
            Err(err) => {
                log::error!("{container_id}: document load failed: {err}");
                return Err(err.into());
            }
        };

        let total = document.page_count();
        log::debug!("{container_id}: rasterizing {total} pages at {RENDER_SCALE}x");
        let tasks: Vec<_> = (1..=total)
            .map(|page| document.render_page(page, RENDER_SCALE))
            .collect();
        // Barrier: no surface exists until every page raster has completed.
        let bitmaps = raster::join_pages(tasks).await?;

        let state = SessionState::default();
        let mut surfaces = Vec::with_capacity(total);
        for (slot, bitmap) in bitmaps.into_iter().enumerate() {
            let mut surface = PageSurface::new(slot + 1, bitmap);
            surface.brush.color = state.color;
            surface.capture_snapshot()?;
            surfaces.push(surface);
        }
        let arrow_tools = surfaces.iter().map(|_| ArrowTool::new()).collect();

        if let Some(ready) = options.ready.take() {
            ready();
        }

        Ok(Self {
            container_id: container_id.to_string(),
            surfaces,
            arrow_tools,
            state,
            on_page_updated: options.on_page_updated,
            signature_asset: options.signature_asset,
        })
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Number of page surfaces.
    pub fn page_count(&self) -> usize {
        self.surfaces.len()
    }

    /// A surface by 1-based page number.
    pub fn surface(&self, page: usize) -> Option<&PageSurface> {
        self.surfaces.get(page.wrapping_sub(1))
    }

    /// All surfaces in page order.
    pub fn surfaces(&self) -> &[PageSurface] {
        &self.surfaces
    }

    /// Session-global state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// 1-based number of the surface most recently interacted with.
    pub fn active_page_number(&self) -> usize {
        self.state.active_page + 1
    }

    // --- interaction routing -------------------------------------------------

    /// Route a click at container coordinates to the surface under it.
    ///
    /// Records that surface as the new active page, translates the position
    /// into surface-local coordinates, and dispatches to the active tool.
    pub async fn handle_click(
        &mut self,
        position: Point,
        assets: &dyn AssetFetcher,
    ) -> SessionResult<()> {
        let Some(slot) = self.surface_slot_at(position) else {
            log::debug!("{}: click outside any page", self.container_id);
            return Ok(());
        };
        self.state.active_page = slot;
        let local = self.to_surface_local(slot, position);
        self.dispatch_click(slot, local, assets).await
    }

    async fn dispatch_click(
        &mut self,
        slot: usize,
        local: Point,
        assets: &dyn AssetFetcher,
    ) -> SessionResult<()> {
        match self.state.active_tool {
            ToolKind::Selector => {
                self.surfaces[slot].select_at(local);
            }
            ToolKind::Pencil => {
                // Freehand capture is driven by the drag handlers.
            }
            ToolKind::Text => {
                let event = place_text(&self.state, &mut self.surfaces[slot], local)?;
                self.emit(event);
                // Single-shot: revert unconditionally after one placement.
                self.state.active_tool = ToolKind::Selector;
            }
            ToolKind::Arrow => {
                let style = self.state.object_style();
                if let Some(arrow) = self.arrow_tools[slot].click(local, &style) {
                    let page = self.surfaces[slot].index;
                    let event = self.surfaces[slot].add_object(Shape::Arrow(arrow))?;
                    self.emit(event);
                    self.emit(SurfaceEvent::ToolCompleted { page });
                }
            }
            ToolKind::Rectangle => {
                // The rectangle tool inserts on enable, not on click.
            }
            ToolKind::Signature => {
                let fetched = assets.fetch(&self.signature_asset).await?;
                let stamp = Image::from_fetched(local, &fetched).scaled(SIGNATURE_SCALE);
                let id = stamp.id;
                let event = self.surfaces[slot].add_object(Shape::Image(stamp))?;
                self.emit(event);
                // Leave the stamp selected so it can be repositioned.
                self.surfaces[slot].select(id);
                self.state.active_tool = ToolKind::Selector;
            }
        }
        Ok(())
    }

    /// Begin a freehand stroke at container coordinates. No-op unless the
    /// surface under the position has free-draw enabled.
    pub fn handle_drag_start(&mut self, position: Point) {
        let Some(slot) = self.surface_slot_at(position) else {
            return;
        };
        self.state.active_page = slot;
        let local = self.to_surface_local(slot, position);
        self.surfaces[slot].begin_stroke(local);
    }

    /// Extend the stroke on the active surface.
    pub fn handle_drag_move(&mut self, position: Point) {
        let slot = self.state.active_page;
        if slot >= self.surfaces.len() {
            return;
        }
        let local = self.to_surface_local(slot, position);
        self.surfaces[slot].extend_stroke(local);
    }

    /// Finish the stroke on the active surface, committing it as an object.
    pub fn handle_drag_end(&mut self) -> SessionResult<()> {
        let slot = self.state.active_page;
        if slot >= self.surfaces.len() {
            return Ok(());
        }
        if let Some(event) = self.surfaces[slot].finish_stroke()? {
            self.emit(event);
        }
        Ok(())
    }

    /// Surfaces stack vertically in page order; find the one under `position`.
    fn surface_slot_at(&self, position: Point) -> Option<usize> {
        let mut offset = 0.0;
        for (slot, surface) in self.surfaces.iter().enumerate() {
            let (w, h) = surface.size();
            if position.y >= offset
                && position.y < offset + h as f64
                && position.x >= 0.0
                && position.x < w as f64
            {
                return Some(slot);
            }
            offset += h as f64;
        }
        None
    }

    fn to_surface_local(&self, slot: usize, position: Point) -> Point {
        let offset: f64 = self.surfaces[..slot]
            .iter()
            .map(|s| s.size().1 as f64)
            .sum();
        Point::new(position.x, position.y - offset)
    }

    /// Deliver a surface event to the session's single subscriber.
    fn emit(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::ObjectAdded { page, old, new } => {
                if let Some(callback) = &mut self.on_page_updated {
                    callback(page, &old, &new);
                }
            }
            SurfaceEvent::ToolCompleted { page } => {
                log::debug!("{}: tool completed on page {page}", self.container_id);
                self.state.active_tool = ToolKind::Selector;
                for tool in &mut self.arrow_tools {
                    tool.reset();
                }
            }
        }
    }

    // --- tool transitions ----------------------------------------------------

    /// Selection mode: no insert tool, free-draw disabled everywhere.
    pub fn enable_selector(&mut self) {
        self.set_tool(ToolKind::Selector);
    }

    /// Freehand mode: every surface captures strokes with its brush.
    pub fn enable_pencil(&mut self) {
        self.set_tool(ToolKind::Pencil);
    }

    /// Single-shot text mode. `control` supplies the default content.
    pub fn enable_add_text(&mut self, control: Option<Control>) {
        self.set_tool(ToolKind::Text);
        self.state.control = control;
    }

    /// Insert a fixed-size rectangle on the active surface immediately.
    ///
    /// Unlike the other tools this does not wait for a click.
    pub fn enable_rectangle(&mut self) -> SessionResult<()> {
        self.set_tool(ToolKind::Rectangle);

        let style = self.state.object_style();
        let surface = self.active_surface_mut()?;
        let rect = Rectangle::stamp(Point::ZERO, style);
        let event = surface.add_object(Shape::Rectangle(rect))?;
        self.emit(event);
        Ok(())
    }

    /// Two-click arrow mode: an arrow tool is attached to every surface, and
    /// completing an arrow on any one page reverts the global tool state.
    pub fn enable_add_arrow(&mut self) {
        self.set_tool(ToolKind::Arrow);
        for tool in &mut self.arrow_tools {
            tool.reset();
        }
    }

    /// Single-shot signature mode: the next click fetches the configured
    /// signature asset and stamps it at the click position.
    pub fn set_add_sign_img(&mut self) {
        self.set_tool(ToolKind::Signature);
    }

    /// Switch the global tool and align every surface's free-draw flag.
    fn set_tool(&mut self, tool: ToolKind) {
        self.state.active_tool = tool;
        self.set_free_drawing(tool.free_drawing());
    }

    fn set_free_drawing(&mut self, enabled: bool) {
        for surface in &mut self.surfaces {
            surface.free_drawing = enabled;
        }
    }

    // --- editing operations --------------------------------------------------

    /// Remove the selected object on the active surface, behind a
    /// confirmation gate. Returns whether an object was removed.
    pub fn delete_selected_object(&mut self, confirm: &dyn Confirm) -> SessionResult<bool> {
        let surface = self.active_surface_mut()?;
        if surface.selected().is_none() {
            return Ok(false);
        }
        if !confirm.confirm("Are you sure?") {
            return Ok(false);
        }
        Ok(surface.remove_selected().is_some())
    }

    /// Remove every object from the active surface and restore its original
    /// background, behind a confirmation gate.
    pub fn clear_active_page(&mut self, confirm: &dyn Confirm) -> SessionResult<bool> {
        let surface = self.active_surface_mut()?;
        if !confirm.confirm("Are you sure?") {
            return Ok(false);
        }
        surface.clear()?;
        Ok(true)
    }

    fn active_surface_mut(&mut self) -> SessionResult<&mut PageSurface> {
        let slot = self.state.active_page;
        match self.surfaces.get_mut(slot) {
            Some(surface) => Ok(surface),
            None => {
                log::warn!(
                    "{}: no active surface for page {}",
                    self.container_id,
                    slot + 1
                );
                Err(SessionError::PageOutOfRange(slot + 1))
            }
        }
    }

    // --- configuration -------------------------------------------------------

    /// Set the primary color; propagates immediately to every surface's
    /// free-draw brush, including surfaces not currently active.
    pub fn set_color(&mut self, hex: &str) -> SessionResult<()> {
        let color = SerializableColor::from_hex(hex)
            .ok_or_else(|| SessionError::InvalidColor(hex.to_string()))?;
        self.state.color = color;
        for surface in &mut self.surfaces {
            surface.brush.color = color;
        }
        Ok(())
    }

    /// Set the outline color for new objects.
    pub fn set_border_color(&mut self, hex: &str) -> SessionResult<()> {
        self.state.border_color = SerializableColor::from_hex(hex)
            .ok_or_else(|| SessionError::InvalidColor(hex.to_string()))?;
        Ok(())
    }

    /// Set every surface's free-draw brush width.
    pub fn set_brush_size(&mut self, size: f64) {
        for surface in &mut self.surfaces {
            surface.brush.width = size;
        }
    }

    pub fn set_border_size(&mut self, size: f64) {
        self.state.border_size = size;
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.state.font_size = size;
    }

    // --- serialization & export ----------------------------------------------

    /// Full-fidelity dump of every surface's state, pretty-printed.
    pub fn serialize_pdf(&self) -> SessionResult<String> {
        Ok(serde_json::to_string_pretty(&self.surfaces)?)
    }

    /// Replace annotation objects per page from serialized entries, matched
    /// by position. A shorter array leaves the remaining surfaces untouched;
    /// excess entries are ignored.
    pub fn load_from_json(&mut self, per_page_data: &[serde_json::Value]) -> SessionResult<()> {
        for (surface, entry) in self.surfaces.iter_mut().zip(per_page_data) {
            surface.load_objects(entry)?;
        }
        Ok(())
    }

    /// Place a signature image at explicit coordinates on the active surface.
    pub async fn add_signature(
        &mut self,
        placement: SignaturePlacement,
        assets: &dyn AssetFetcher,
    ) -> SessionResult<()> {
        self.set_free_drawing(false);
        let fetched = assets.fetch(&placement.src).await?;
        let at = Point::new(placement.x_axis, placement.y_axis);
        let image = Image::from_fetched(at, &fetched);
        let surface = self.active_surface_mut()?;
        let event = surface.add_object(Shape::Image(image))?;
        self.emit(event);
        Ok(())
    }

    /// Flatten every surface into a full-page image on its own output page,
    /// in surface order, and save under [`EXPORT_FILE_NAME`].
    ///
    /// The first surface reuses the exporter's default first page; later
    /// surfaces are appended before being populated.
    pub fn save_pdf(
        &self,
        flattener: &dyn PageFlattener,
        exporter: &mut dyn DocumentExporter,
    ) -> SessionResult<()> {
        for (slot, surface) in self.surfaces.iter().enumerate() {
            if slot != 0 {
                exporter.add_page()?;
            }
            let flattened = flattener.flatten(surface)?;
            exporter.add_image(&flattened)?;
        }
        exporter.save(EXPORT_FILE_NAME)?;
        log::debug!(
            "{}: exported {} pages to {EXPORT_FILE_NAME}",
            self.container_id,
            self.surfaces.len()
        );
        Ok(())
    }
}

/// Place an editable text object with content derived from the control.
fn place_text(
    state: &SessionState,
    surface: &mut PageSurface,
    at: Point,
) -> Result<SurfaceEvent, serde_json::Error> {
    let content = state
        .control
        .as_ref()
        .map(Control::text_content)
        .unwrap_or_else(|| DEFAULT_TEXT_CONTENT.to_string());
    let mut text = Text::new(at, content);
    text.font_size = state.font_size;
    text.style = state.object_style();
    surface.add_object(Shape::Text(text))
}
