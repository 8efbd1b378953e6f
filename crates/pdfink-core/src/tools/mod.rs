//! Tool modes and tool state machines.
//!
//! The active tool is global to the session: switching tools mid-interaction
//! on one page affects every page.

mod arrow;

pub use arrow::ArrowTool;

use serde::{Deserialize, Serialize};

/// The single global mode determining how the next interaction on any
/// surface is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    /// No insert tool active; clicks select and move existing objects.
    Selector,
    /// Freehand drawing, captured natively by each surface.
    #[default]
    Pencil,
    /// Single-shot text placement on the next click.
    Text,
    /// Two-click arrow placement.
    Arrow,
    /// Immediate fixed-size rectangle insert.
    Rectangle,
    /// Single-shot signature stamp placement on the next click.
    Signature,
}

impl ToolKind {
    /// Whether surfaces should capture freehand strokes in this mode.
    pub fn free_drawing(&self) -> bool {
        matches!(self, ToolKind::Pencil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tool_is_pencil() {
        assert_eq!(ToolKind::default(), ToolKind::Pencil);
    }

    #[test]
    fn test_only_pencil_draws() {
        assert!(ToolKind::Pencil.free_drawing());
        assert!(!ToolKind::Selector.free_drawing());
        assert!(!ToolKind::Arrow.free_drawing());
    }
}
