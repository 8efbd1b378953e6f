//! Arrow annotation shape.

use super::{ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An arrow: a shaft line capped by a triangular head at each end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arrow {
    pub(crate) id: ShapeId,
    /// Tail point (first click).
    pub start: Point,
    /// Head point (second click).
    pub end: Point,
    /// Size of each triangular head.
    pub head_size: f64,
    /// Style properties (`color` is the ink).
    pub style: ShapeStyle,
}

impl Arrow {
    /// Create a new arrow between two points.
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            head_size: 15.0,
            style: ShapeStyle::default(),
        }
    }

    /// Direction vector from tail to head (normalized).
    pub fn direction(&self) -> Vec2 {
        let d = Vec2::new(self.end.x - self.start.x, self.end.y - self.start.y);
        let len = d.hypot();
        if len < f64::EPSILON {
            Vec2::new(1.0, 0.0)
        } else {
            d / len
        }
    }

    /// Length of the shaft.
    pub fn length(&self) -> f64 {
        Vec2::new(self.end.x - self.start.x, self.end.y - self.start.y).hypot()
    }

    /// The two head triangles, tail end first.
    ///
    /// Each triangle's first vertex is the tip; the raster layer fills them.
    pub fn head_triangles(&self) -> [[Point; 3]; 2] {
        [
            self.head_at(self.start, -self.direction()),
            self.head_at(self.end, self.direction()),
        ]
    }

    fn head_at(&self, tip: Point, dir: Vec2) -> [Point; 3] {
        let perp = Vec2::new(-dir.y, dir.x);
        let base = Point::new(tip.x - dir.x * self.head_size, tip.y - dir.y * self.head_size);
        let left = Point::new(
            base.x + perp.x * self.head_size * 0.5,
            base.y + perp.y * self.head_size * 0.5,
        );
        let right = Point::new(
            base.x - perp.x * self.head_size * 0.5,
            base.y - perp.y * self.head_size * 0.5,
        );
        [tip, left, right]
    }
}

impl ShapeTrait for Arrow {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let mut min_x = self.start.x.min(self.end.x);
        let mut min_y = self.start.y.min(self.end.y);
        let mut max_x = self.start.x.max(self.end.x);
        let mut max_y = self.start.y.max(self.end.y);
        for triangle in self.head_triangles() {
            for p in triangle {
                min_x = min_x.min(p.x);
                min_y = min_y.min(p.y);
                max_x = max_x.max(p.x);
                max_y = max_y.max(p.y);
            }
        }
        Rect::new(min_x, min_y, max_x, max_y)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let shaft = super::point_to_segment_dist(point, self.start, self.end);
        if shaft <= tolerance + self.style.border_width / 2.0 {
            return true;
        }
        self.head_triangles()
            .iter()
            .any(|t| point_in_triangle(point, t))
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        if self.start == self.end {
            return path;
        }
        path.move_to(self.start);
        path.line_to(self.end);
        for [tip, left, right] in self.head_triangles() {
            path.move_to(tip);
            path.line_to(left);
            path.line_to(right);
            path.close_path();
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
        self.start += delta;
        self.end += delta;
    }
}

fn point_in_triangle(point: Point, triangle: &[Point; 3]) -> bool {
    fn sign(p1: Point, p2: Point, p3: Point) -> f64 {
        (p1.x - p3.x) * (p2.y - p3.y) - (p2.x - p3.x) * (p1.y - p3.y)
    }

    let d1 = sign(point, triangle[0], triangle[1]);
    let d2 = sign(point, triangle[1], triangle[2]);
    let d3 = sign(point, triangle[2], triangle[0]);

    let has_neg = (d1 < 0.0) || (d2 < 0.0) || (d3 < 0.0);
    let has_pos = (d1 > 0.0) || (d2 > 0.0) || (d3 > 0.0);

    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_length() {
        let arrow = Arrow::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!((arrow.length() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_two_heads() {
        let arrow = Arrow::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let [tail, head] = arrow.head_triangles();
        assert_eq!(tail[0], Point::new(0.0, 0.0));
        assert_eq!(head[0], Point::new(100.0, 0.0));
        // Tail head opens away from the shaft.
        assert!(tail[1].x > 0.0 && head[1].x < 100.0);
    }

    #[test]
    fn test_hit_test_shaft_and_heads() {
        let arrow = Arrow::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!(arrow.hit_test(Point::new(50.0, 0.0), 2.0));
        assert!(arrow.hit_test(Point::new(100.0, 0.0), 0.0));
        assert!(arrow.hit_test(Point::new(0.0, 0.0), 0.0));
        assert!(!arrow.hit_test(Point::new(50.0, 30.0), 2.0));
    }

    #[test]
    fn test_degenerate_arrow_has_empty_path() {
        let arrow = Arrow::new(Point::new(5.0, 5.0), Point::new(5.0, 5.0));
        assert_eq!(arrow.to_path().elements().len(), 0);
    }
}
