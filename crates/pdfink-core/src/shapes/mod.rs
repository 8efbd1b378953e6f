//! Annotation object definitions.
//!
//! The session treats these as opaque beyond add/remove/serialize; geometry
//! and hit-testing live with each variant.

mod arrow;
mod freehand;
mod image;
mod rectangle;
mod text;

pub use arrow::Arrow;
pub use freehand::Freehand;
pub use image::{Image, ImageFormat};
pub use rectangle::Rectangle;
pub use text::Text;

use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Parse `#rgb`, `#rrggbb`, or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?.trim();
        match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self::new(r, g, b, 255))
            }
            8 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
                Some(Self::new(r, g, b, a))
            }
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// RGBA byte tuple, as the raster layer consumes it.
    pub fn rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Style properties shared by all annotation objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Primary color: fill for rectangles, ink for text and strokes.
    pub color: SerializableColor,
    /// Outline color.
    pub border_color: SerializableColor,
    /// Outline width.
    pub border_width: f64,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            color: SerializableColor::new(0x21, 0x21, 0x21, 255),
            border_color: SerializableColor::black(),
            border_width: 1.0,
        }
    }
}

/// Unique identifier for annotation objects.
pub type ShapeId = Uuid;

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Common trait for all annotation objects.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Get the bounding box in surface-local coordinates.
    fn bounds(&self) -> Rect;

    /// Check if a surface-local point hits this object.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool;

    /// Get the outline path.
    fn to_path(&self) -> BezPath;

    /// Get the style.
    fn style(&self) -> &ShapeStyle;

    /// Get mutable style.
    fn style_mut(&mut self) -> &mut ShapeStyle;

    /// Move the object by a delta.
    fn translate(&mut self, delta: Vec2);
}

/// Enum wrapper over the annotation object variants (for serialization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Shape {
    Freehand(Freehand),
    Text(Text),
    Arrow(Arrow),
    Rectangle(Rectangle),
    Image(Image),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::Freehand(s) => s.id(),
            Shape::Text(s) => s.id(),
            Shape::Arrow(s) => s.id(),
            Shape::Rectangle(s) => s.id(),
            Shape::Image(s) => s.id(),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Freehand(s) => s.bounds(),
            Shape::Text(s) => s.bounds(),
            Shape::Arrow(s) => s.bounds(),
            Shape::Rectangle(s) => s.bounds(),
            Shape::Image(s) => s.bounds(),
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Shape::Freehand(s) => s.hit_test(point, tolerance),
            Shape::Text(s) => s.hit_test(point, tolerance),
            Shape::Arrow(s) => s.hit_test(point, tolerance),
            Shape::Rectangle(s) => s.hit_test(point, tolerance),
            Shape::Image(s) => s.hit_test(point, tolerance),
        }
    }

    pub fn to_path(&self) -> BezPath {
        match self {
            Shape::Freehand(s) => s.to_path(),
            Shape::Text(s) => s.to_path(),
            Shape::Arrow(s) => s.to_path(),
            Shape::Rectangle(s) => s.to_path(),
            Shape::Image(s) => s.to_path(),
        }
    }

    pub fn style(&self) -> &ShapeStyle {
        match self {
            Shape::Freehand(s) => s.style(),
            Shape::Text(s) => s.style(),
            Shape::Arrow(s) => s.style(),
            Shape::Rectangle(s) => s.style(),
            Shape::Image(s) => s.style(),
        }
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        match self {
            Shape::Freehand(s) => s.style_mut(),
            Shape::Text(s) => s.style_mut(),
            Shape::Arrow(s) => s.style_mut(),
            Shape::Rectangle(s) => s.style_mut(),
            Shape::Image(s) => s.style_mut(),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Shape::Freehand(s) => s.translate(delta),
            Shape::Text(s) => s.translate(delta),
            Shape::Arrow(s) => s.translate(delta),
            Shape::Rectangle(s) => s.translate(delta),
            Shape::Image(s) => s.translate(delta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(
            SerializableColor::from_hex("#212121"),
            Some(SerializableColor::new(0x21, 0x21, 0x21, 255))
        );
        assert_eq!(
            SerializableColor::from_hex("#f00"),
            Some(SerializableColor::new(255, 0, 0, 255))
        );
        assert_eq!(
            SerializableColor::from_hex("#11223344"),
            Some(SerializableColor::new(0x11, 0x22, 0x33, 0x44))
        );
        assert_eq!(SerializableColor::from_hex("red"), None);
        assert_eq!(SerializableColor::from_hex("#1234"), None);
    }

    #[test]
    fn test_hex_roundtrip() {
        let color = SerializableColor::new(0xab, 0xcd, 0xef, 255);
        assert_eq!(SerializableColor::from_hex(&color.to_hex()), Some(color));
    }

    #[test]
    fn test_segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((point_to_segment_dist(Point::new(-4.0, 0.0), a, b) - 4.0).abs() < 1e-9);
    }
}
