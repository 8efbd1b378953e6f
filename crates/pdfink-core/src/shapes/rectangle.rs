//! Rectangle annotation shape.

use super::{ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A filled, stroked rectangle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ShapeId,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Style properties (`color` fills, `border_color`/`border_width` stroke).
    pub style: ShapeStyle,
}

impl Rectangle {
    /// Side length of the rectangle the rectangle tool stamps.
    pub const STAMP_SIZE: f64 = 100.0;

    /// Create a new rectangle.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            width,
            height,
            style: ShapeStyle::default(),
        }
    }

    /// The fixed-size rectangle inserted by the rectangle tool.
    pub fn stamp(position: Point, style: ShapeStyle) -> Self {
        let mut rect = Self::new(position, Self::STAMP_SIZE, Self::STAMP_SIZE);
        rect.style = style;
        rect
    }

    /// Get the rectangle as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

impl ShapeTrait for Rectangle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        // Always filled, so anywhere inside counts.
        self.as_rect().inflate(tolerance, tolerance).contains(point)
    }

    fn to_path(&self) -> BezPath {
        self.as_rect().to_path(0.1)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_dimensions() {
        let rect = Rectangle::stamp(Point::new(10.0, 10.0), ShapeStyle::default());
        assert!((rect.width - 100.0).abs() < f64::EPSILON);
        assert!((rect.height - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test() {
        let rect = Rectangle::new(Point::new(0.0, 0.0), 100.0, 50.0);
        assert!(rect.hit_test(Point::new(50.0, 25.0), 0.0));
        assert!(!rect.hit_test(Point::new(150.0, 25.0), 0.0));
        assert!(rect.hit_test(Point::new(104.0, 25.0), 5.0));
    }

    #[test]
    fn test_bounds() {
        let rect = Rectangle::new(Point::new(10.0, 20.0), 100.0, 50.0);
        assert_eq!(rect.bounds(), Rect::new(10.0, 20.0, 110.0, 70.0));
    }
}
