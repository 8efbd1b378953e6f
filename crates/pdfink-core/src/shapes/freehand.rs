//! Freehand stroke shape.

use super::{ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A captured freehand stroke (series of points).
///
/// `style.color` is the brush color and `style.border_width` the brush width
/// at capture time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Freehand {
    pub(crate) id: ShapeId,
    /// Points in the stroke path.
    pub points: Vec<Point>,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Freehand {
    /// Create an empty stroke.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            points: Vec::new(),
            style: ShapeStyle::default(),
        }
    }

    /// Create from existing points.
    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
            style: ShapeStyle::default(),
        }
    }

    /// Add a point to the path.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for Freehand {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeTrait for Freehand {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        if self.points.is_empty() {
            return Rect::ZERO;
        }
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect::new(min_x, min_y, max_x, max_y).inflate(
            self.style.border_width / 2.0,
            self.style.border_width / 2.0,
        )
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self.points.len() {
            0 => false,
            1 => {
                let p = self.points[0];
                let d = ((point.x - p.x).powi(2) + (point.y - p.y).powi(2)).sqrt();
                d <= tolerance + self.style.border_width / 2.0
            }
            _ => {
                super::point_to_polyline_dist(point, &self.points)
                    <= tolerance + self.style.border_width / 2.0
            }
        }
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        if let Some((first, rest)) = self.points.split_first() {
            path.move_to(*first);
            for p in rest {
                path.line_to(*p);
            }
        }
        path
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            *p += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_capture() {
        let mut stroke = Freehand::new();
        assert!(stroke.is_empty());
        stroke.add_point(Point::new(0.0, 0.0));
        stroke.add_point(Point::new(10.0, 10.0));
        assert_eq!(stroke.len(), 2);
    }

    #[test]
    fn test_hit_test_on_segment() {
        let stroke = Freehand::from_points(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        assert!(stroke.hit_test(Point::new(50.0, 2.0), 3.0));
        assert!(!stroke.hit_test(Point::new(50.0, 20.0), 3.0));
    }

    #[test]
    fn test_translate() {
        let mut stroke = Freehand::from_points(vec![Point::new(1.0, 1.0)]);
        stroke.translate(Vec2::new(5.0, -1.0));
        assert_eq!(stroke.points[0], Point::new(6.0, 0.0));
    }
}
