#![forbid(unsafe_code)]

//! Frame values and the seams to the external scene tree and renderer.
//!
//! The runtime never looks inside a tree. It only needs three things from
//! the outside world:
//!
//! - a [`SceneTree`] that accepts new content and reports mutations through
//!   [`FrameTriggers`],
//! - a [`Renderer`] that turns the tree into a [`FrameOutput`],
//! - an [`OutputStream`](crate::stream::OutputStream) to paint on.

use crate::compositor::RenderMode;
use crate::triggers::FrameTriggers;

/// Lone newline a renderer emits when no static content was produced.
pub const EMPTY_STATIC: &str = "\n";

/// Result of one paint cycle, produced by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameOutput {
    /// Live region text, redrawn in place each frame.
    pub output: String,
    /// Number of terminal rows the live region occupies.
    pub output_height: u16,
    /// Newly committed permanent text, or [`EMPTY_STATIC`].
    pub static_output: String,
}

impl FrameOutput {
    /// Frame with a live region and no new static content.
    pub fn live(output: impl Into<String>, output_height: u16) -> Self {
        Self {
            output: output.into(),
            output_height,
            static_output: EMPTY_STATIC.to_string(),
        }
    }

    /// Frame with both a live region and new static content.
    pub fn with_static(
        output: impl Into<String>,
        output_height: u16,
        static_output: impl Into<String>,
    ) -> Self {
        Self {
            output: output.into(),
            output_height,
            static_output: static_output.into(),
        }
    }

    /// Whether this frame carries new permanent content.
    #[inline]
    #[must_use]
    pub fn has_static(&self) -> bool {
        is_static_content(&self.static_output)
    }
}

/// Whether `text` is real static content rather than the empty sentinel.
#[inline]
#[must_use]
pub fn is_static_content(text: &str) -> bool {
    !text.is_empty() && text != EMPTY_STATIC
}

/// Read-only facts handed to the renderer on every paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    /// Column count the layout should wrap at.
    pub columns: u16,
    /// Rows of the attached terminal.
    pub rows: u16,
    /// Mode fixed at mount time.
    pub mode: RenderMode,
    /// Whether Ctrl+C should unmount the tree. Consumed by input handling.
    pub exit_on_ctrl_c: bool,
}

/// Retained UI structure owned by an instance.
///
/// Implementations call the triggers handed to [`attach`](Self::attach)
/// whenever their content changes: `trigger_immediate` for changes that
/// must be painted this tick (new static content), `trigger_throttled` for
/// everything else.
pub trait SceneTree {
    /// Top-level content accepted by [`update`](Self::update).
    type Element;

    /// Wire the tree's mutation callbacks to the instance.
    fn attach(&mut self, triggers: FrameTriggers);

    /// Replace the mounted content. `None` tears the content down.
    fn update(&mut self, element: Option<Self::Element>);
}

/// Pure layout-and-paint function from a tree snapshot to a frame.
pub trait Renderer<T: ?Sized> {
    /// Paint `tree` into a frame.
    fn render(&mut self, tree: &T, ctx: &RenderContext) -> FrameOutput;
}

impl<T: ?Sized, F> Renderer<T> for F
where
    F: FnMut(&T, &RenderContext) -> FrameOutput,
{
    fn render(&mut self, tree: &T, ctx: &RenderContext) -> FrameOutput {
        self(tree, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_newline_is_not_static() {
        assert!(!FrameOutput::live("x", 1).has_static());
        assert!(!FrameOutput::with_static("x", 1, "").has_static());
    }

    #[test]
    fn real_static_is_detected() {
        assert!(FrameOutput::with_static("x", 1, "Log1\n").has_static());
        assert!(FrameOutput::with_static("x", 1, "\n\n").has_static());
    }

    #[test]
    fn closures_are_renderers() {
        let mut renderer = |tree: &String, _ctx: &RenderContext| FrameOutput::live(tree.clone(), 1);
        let ctx = RenderContext {
            columns: 80,
            rows: 24,
            mode: RenderMode::Interactive,
            exit_on_ctrl_c: true,
        };
        let frame = renderer.render(&"hello".to_string(), &ctx);
        assert_eq!(frame.output, "hello");
    }
}
