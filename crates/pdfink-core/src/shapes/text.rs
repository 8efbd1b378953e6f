//! Text annotation shape.

use super::{ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Average glyph advance as a fraction of the font size. Glyph layout is an
/// external concern; bounds computed from this are approximate.
const GLYPH_ADVANCE: f64 = 0.6;

/// Line height as a fraction of the font size.
const LINE_HEIGHT: f64 = 1.2;

/// An editable text annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ShapeId,
    /// Top-left corner of the text box.
    pub position: Point,
    /// The text content.
    pub content: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Style properties (`color` is the fill).
    pub style: ShapeStyle,
}

impl Text {
    /// Create a new text annotation.
    pub fn new(position: Point, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            content: content.into(),
            font_size: 16.0,
            style: ShapeStyle::default(),
        }
    }

    /// Approximate layout size of the content.
    pub fn layout_size(&self) -> (f64, f64) {
        let mut lines = 0usize;
        let mut widest = 0usize;
        for line in self.content.lines() {
            lines += 1;
            widest = widest.max(line.chars().count());
        }
        // An empty string still occupies one caret-height line.
        let lines = lines.max(1);
        (
            widest as f64 * self.font_size * GLYPH_ADVANCE,
            lines as f64 * self.font_size * LINE_HEIGHT,
        )
    }
}

impl ShapeTrait for Text {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let (w, h) = self.layout_size();
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + w,
            self.position.y + h,
        )
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    fn to_path(&self) -> BezPath {
        self.bounds().to_path(0.1)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}
