//! Two-click arrow placement tool.

use crate::shapes::{Arrow, ShapeStyle};
use kurbo::Point;

/// Per-surface arrow tool: the first click anchors the tail, the second
/// click places the head and completes the placement.
///
/// One tool is attached to every surface while the arrow mode is active;
/// whichever surface completes first ends the mode for all of them.
#[derive(Debug, Default, Clone)]
pub struct ArrowTool {
    anchor: Option<Point>,
}

impl ArrowTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a click. Returns the completed arrow on the second click.
    pub fn click(&mut self, point: Point, style: &ShapeStyle) -> Option<Arrow> {
        match self.anchor.take() {
            None => {
                self.anchor = Some(point);
                None
            }
            Some(anchor) => {
                let mut arrow = Arrow::new(anchor, point);
                arrow.style = style.clone();
                Some(arrow)
            }
        }
    }

    /// Whether the first click has been placed.
    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// Drop any pending anchor.
    pub fn reset(&mut self) {
        self.anchor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_click_placement() {
        let mut tool = ArrowTool::new();
        let style = ShapeStyle::default();

        assert!(tool.click(Point::new(10.0, 10.0), &style).is_none());
        assert!(tool.is_anchored());

        let arrow = tool.click(Point::new(50.0, 60.0), &style).unwrap();
        assert_eq!(arrow.start, Point::new(10.0, 10.0));
        assert_eq!(arrow.end, Point::new(50.0, 60.0));
        assert!(!tool.is_anchored());
    }

    #[test]
    fn test_reset_discards_anchor() {
        let mut tool = ArrowTool::new();
        tool.click(Point::new(1.0, 1.0), &ShapeStyle::default());
        tool.reset();
        assert!(!tool.is_anchored());
        // Next click anchors again rather than completing.
        assert!(tool.click(Point::new(2.0, 2.0), &ShapeStyle::default()).is_none());
    }
}
