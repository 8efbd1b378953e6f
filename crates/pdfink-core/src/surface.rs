//! Page surfaces: one editable overlay per rendered page.

use crate::raster::PageBitmap;
use crate::shapes::{Freehand, SerializableColor, Shape, ShapeId, ShapeStyle};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Hit-test tolerance for selection clicks, in surface pixels.
const HIT_TOLERANCE: f64 = 4.0;

/// Serialized form of a surface's annotation-object set at a point in time.
pub type Snapshot = serde_json::Value;

/// Free-draw brush configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub color: SerializableColor,
    pub width: f64,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: SerializableColor::new(0x21, 0x21, 0x21, 255),
            width: 1.0,
        }
    }
}

/// Notification emitted by a surface mutation, consumed by the session.
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    /// An annotation object was added; snapshots are captured synchronously
    /// with the add, before any further add on the same surface.
    ObjectAdded {
        /// 1-based page number.
        page: usize,
        old: Snapshot,
        new: Snapshot,
    },
    /// A multi-click tool finished its placement on this surface.
    ToolCompleted { page: usize },
}

/// An editable overlay bound to one page's rasterized background.
///
/// Owned exclusively by the session. The serialized form is the full surface
/// state (objects plus configuration), which `serialize_pdf` dumps verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSurface {
    /// 1-based page number, stable for the document's lifetime.
    pub index: usize,
    /// Current background raster.
    background: PageBitmap,
    /// Background captured at creation; what `clear` restores.
    #[serde(skip)]
    original_background: PageBitmap,
    /// Annotation objects in insertion order.
    objects: Vec<Shape>,
    /// Whether freehand capture is enabled.
    pub free_drawing: bool,
    /// Free-draw brush.
    pub brush: Brush,
    /// Last captured snapshot of the object set.
    #[serde(skip)]
    snapshot: Snapshot,
    /// Currently selected object, if any.
    #[serde(skip)]
    selected: Option<ShapeId>,
    /// In-progress freehand capture.
    #[serde(skip)]
    stroke: Option<Freehand>,
}

impl PageSurface {
    /// Bind a new surface to a page raster. Free-draw capture starts enabled.
    pub fn new(index: usize, background: PageBitmap) -> Self {
        Self {
            index,
            original_background: background.clone(),
            background,
            objects: Vec::new(),
            free_drawing: true,
            brush: Brush::default(),
            snapshot: Snapshot::Null,
            selected: None,
            stroke: None,
        }
    }

    /// Current background raster.
    pub fn background(&self) -> &PageBitmap {
        &self.background
    }

    /// Mutable background, for hosts that paint into the raster directly.
    pub fn background_mut(&mut self) -> &mut PageBitmap {
        &mut self.background
    }

    /// Background dimensions in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.background.width, self.background.height)
    }

    /// Annotation objects in insertion order.
    pub fn objects(&self) -> &[Shape] {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Last captured snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Re-serialize the object set into the cached snapshot.
    pub fn capture_snapshot(&mut self) -> Result<(), serde_json::Error> {
        self.snapshot = serde_json::to_value(&self.objects)?;
        Ok(())
    }

    /// Add an object, capture the new snapshot, and report the change.
    pub fn add_object(&mut self, shape: Shape) -> Result<SurfaceEvent, serde_json::Error> {
        self.objects.push(shape);
        let old = std::mem::replace(&mut self.snapshot, Snapshot::Null);
        self.capture_snapshot()?;
        Ok(SurfaceEvent::ObjectAdded {
            page: self.index,
            old,
            new: self.snapshot.clone(),
        })
    }

    /// Remove an object by id.
    pub fn remove_object(&mut self, id: ShapeId) -> Option<Shape> {
        let position = self.objects.iter().position(|s| s.id() == id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(self.objects.remove(position))
    }

    /// Remove every object and restore the creation-time background.
    pub fn clear(&mut self) -> Result<(), serde_json::Error> {
        self.objects.clear();
        self.selected = None;
        self.stroke = None;
        self.background = self.original_background.clone();
        self.capture_snapshot()
    }

    /// Currently selected object.
    pub fn selected(&self) -> Option<ShapeId> {
        self.selected
    }

    /// Select a known object. Returns false if the id is not on this surface.
    pub fn select(&mut self, id: ShapeId) -> bool {
        if self.objects.iter().any(|s| s.id() == id) {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Hit-test front-to-back and select the topmost object under the point.
    pub fn select_at(&mut self, point: Point) -> Option<ShapeId> {
        self.selected = self
            .objects
            .iter()
            .rev()
            .find(|s| s.hit_test(point, HIT_TOLERANCE))
            .map(|s| s.id());
        self.selected
    }

    /// Move the selected object by a delta. Returns whether anything moved.
    pub fn move_selected(&mut self, delta: Vec2) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        match self.objects.iter_mut().find(|s| s.id() == id) {
            Some(shape) => {
                shape.translate(delta);
                true
            }
            None => false,
        }
    }

    /// Remove the selected object.
    pub fn remove_selected(&mut self) -> Option<Shape> {
        let id = self.selected?;
        self.remove_object(id)
    }

    /// Begin freehand capture at a point. No-op unless free-draw is enabled.
    pub fn begin_stroke(&mut self, point: Point) -> bool {
        if !self.free_drawing {
            return false;
        }
        let mut stroke = Freehand::new();
        stroke.style = ShapeStyle {
            color: self.brush.color,
            border_color: self.brush.color,
            border_width: self.brush.width,
        };
        stroke.add_point(point);
        self.stroke = Some(stroke);
        true
    }

    /// Extend the in-progress stroke.
    pub fn extend_stroke(&mut self, point: Point) {
        if let Some(stroke) = &mut self.stroke {
            stroke.add_point(point);
        }
    }

    /// Finish the in-progress stroke, committing it as an object when it has
    /// at least two points.
    pub fn finish_stroke(&mut self) -> Result<Option<SurfaceEvent>, serde_json::Error> {
        let Some(stroke) = self.stroke.take() else {
            return Ok(None);
        };
        if stroke.len() < 2 {
            log::debug!("page {}: dropping degenerate stroke", self.index);
            return Ok(None);
        }
        self.add_object(Shape::Freehand(stroke)).map(Some)
    }

    /// Replace the object set from a serialized entry and recapture the
    /// snapshot. Accepts either a full surface dump or a bare object array.
    pub fn load_objects(&mut self, entry: &serde_json::Value) -> Result<(), serde_json::Error> {
        #[derive(Deserialize)]
        struct ObjectsDump {
            objects: Vec<Shape>,
        }

        let objects = if entry.is_array() {
            serde_json::from_value::<Vec<Shape>>(entry.clone())?
        } else {
            serde_json::from_value::<ObjectsDump>(entry.clone())?.objects
        };
        self.objects = objects;
        self.selected = None;
        self.capture_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Rectangle;

    fn surface() -> PageSurface {
        PageSurface::new(1, PageBitmap::white(100, 100))
    }

    fn rect_at(x: f64, y: f64) -> Shape {
        Shape::Rectangle(Rectangle::new(Point::new(x, y), 10.0, 10.0))
    }

    #[test]
    fn test_add_object_reports_snapshots() {
        let mut surface = surface();
        surface.capture_snapshot().unwrap();

        let event = surface.add_object(rect_at(0.0, 0.0)).unwrap();
        let SurfaceEvent::ObjectAdded { page, old, new } = event else {
            panic!("expected ObjectAdded");
        };
        assert_eq!(page, 1);
        assert_eq!(old, serde_json::json!([]));
        assert_eq!(new.as_array().map(|a| a.len()), Some(1));
        assert_eq!(surface.snapshot(), &new);
    }

    #[test]
    fn test_clear_restores_original_background() {
        let mut surface = surface();
        surface.add_object(rect_at(0.0, 0.0)).unwrap();
        surface.background_mut().set_pixel(3, 3, [9, 9, 9, 255]);

        surface.clear().unwrap();

        assert_eq!(surface.object_count(), 0);
        assert_eq!(surface.background().pixel(3, 3), [255, 255, 255, 255]);
        assert_eq!(surface.snapshot(), &serde_json::json!([]));
    }

    #[test]
    fn test_select_at_prefers_topmost() {
        let mut surface = surface();
        surface.add_object(rect_at(0.0, 0.0)).unwrap();
        surface.add_object(rect_at(5.0, 5.0)).unwrap();
        let top = surface.objects()[1].id();

        assert_eq!(surface.select_at(Point::new(7.0, 7.0)), Some(top));
        assert_eq!(surface.select_at(Point::new(90.0, 90.0)), None);
    }

    #[test]
    fn test_move_selected() {
        let mut surface = surface();
        surface.add_object(rect_at(0.0, 0.0)).unwrap();

        assert!(!surface.move_selected(Vec2::new(5.0, 5.0)));
        surface.select_at(Point::new(5.0, 5.0));
        assert!(surface.move_selected(Vec2::new(5.0, 5.0)));

        let moved = surface.objects()[0].bounds();
        assert_eq!(moved.origin(), Point::new(5.0, 5.0));
    }

    #[test]
    fn test_remove_selected() {
        let mut surface = surface();
        surface.add_object(rect_at(0.0, 0.0)).unwrap();
        surface.select_at(Point::new(5.0, 5.0));

        assert!(surface.remove_selected().is_some());
        assert_eq!(surface.object_count(), 0);
        assert_eq!(surface.selected(), None);
    }

    #[test]
    fn test_stroke_capture_requires_drawing_mode() {
        let mut surface = surface();
        surface.free_drawing = false;
        assert!(!surface.begin_stroke(Point::new(0.0, 0.0)));

        surface.free_drawing = true;
        assert!(surface.begin_stroke(Point::new(0.0, 0.0)));
        surface.extend_stroke(Point::new(5.0, 5.0));
        let event = surface.finish_stroke().unwrap();
        assert!(event.is_some());
        assert_eq!(surface.object_count(), 1);
    }

    #[test]
    fn test_degenerate_stroke_is_dropped() {
        let mut surface = surface();
        surface.begin_stroke(Point::new(0.0, 0.0));
        let event = surface.finish_stroke().unwrap();
        assert!(event.is_none());
        assert_eq!(surface.object_count(), 0);
    }

    #[test]
    fn test_stroke_uses_brush_style() {
        let mut surface = surface();
        surface.brush = Brush {
            color: SerializableColor::new(1, 2, 3, 255),
            width: 7.0,
        };
        surface.begin_stroke(Point::new(0.0, 0.0));
        surface.extend_stroke(Point::new(5.0, 0.0));
        surface.finish_stroke().unwrap();

        let style = surface.objects()[0].style();
        assert_eq!(style.color, SerializableColor::new(1, 2, 3, 255));
        assert!((style.border_width - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_objects_from_dump_and_array() {
        let mut source = surface();
        source.add_object(rect_at(0.0, 0.0)).unwrap();
        let dump = serde_json::to_value(&source).unwrap();

        let mut target = surface();
        target.load_objects(&dump).unwrap();
        assert_eq!(target.object_count(), 1);

        let bare = serde_json::to_value(source.objects()).unwrap();
        let mut target = surface();
        target.load_objects(&bare).unwrap();
        assert_eq!(target.object_count(), 1);
    }
}
