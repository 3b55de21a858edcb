//! Shared scene tree and renderer for the runtime integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use inkling_core::geometry::TerminalSize;
use inkling_runtime::{
    CaptureHandle, CapturedStream, EMPTY_STATIC, FrameOutput, FrameTriggers, Instance,
    RenderContext, RenderOptions, Renderer, SceneTree, StreamRegistry,
};

/// Tree whose content is a ready-made frame.
///
/// Frames carrying static content fire the immediate trigger, like a tree
/// whose permanent-output node just gained children; everything else fires
/// the throttled trigger.
#[derive(Default)]
pub struct FrameTree {
    frame: Option<FrameOutput>,
    generation: u64,
    triggers: Option<FrameTriggers>,
    pub teardowns: usize,
}

impl SceneTree for FrameTree {
    type Element = FrameOutput;

    fn attach(&mut self, triggers: FrameTriggers) {
        self.triggers = Some(triggers);
    }

    fn update(&mut self, element: Option<FrameOutput>) {
        self.generation += 1;
        let immediate = match &element {
            Some(frame) => frame.has_static(),
            None => {
                self.teardowns += 1;
                false
            }
        };
        self.frame = element;
        if let Some(triggers) = &self.triggers {
            if immediate {
                triggers.trigger_immediate();
            } else {
                triggers.trigger_throttled();
            }
        }
    }
}

/// Paints the tree's frame, emitting each update's static content once.
#[derive(Default)]
pub struct Painter {
    painted_generation: u64,
    pub renders: usize,
    pub last_columns: u16,
}

impl Renderer<FrameTree> for Painter {
    fn render(&mut self, tree: &FrameTree, ctx: &RenderContext) -> FrameOutput {
        self.renders += 1;
        self.last_columns = ctx.columns;
        let mut frame = tree.frame.clone().unwrap_or_default();
        if tree.generation == self.painted_generation {
            frame.static_output = EMPTY_STATIC.to_string();
        }
        self.painted_generation = tree.generation;
        frame
    }
}

pub type TestInstance = Instance<FrameTree, Painter, CapturedStream>;

pub fn build() -> (FrameTree, Painter) {
    (FrameTree::default(), Painter::default())
}

pub fn capture(rows: u16) -> (CapturedStream, CaptureHandle) {
    let stream = CapturedStream::new(TerminalSize::new(80, rows));
    let handle = stream.handle();
    (stream, handle)
}

/// Mount on a fresh capture with an isolated registry.
pub fn mount(options: RenderOptions, rows: u16) -> (TestInstance, CaptureHandle) {
    let (stream, handle) = capture(rows);
    let (tree, painter) = build();
    let options = options.with_registry(Arc::new(StreamRegistry::new()));
    let instance = Instance::mount(tree, painter, stream, options).expect("mount");
    (instance, handle)
}

pub fn interactive() -> RenderOptions {
    RenderOptions::default().with_ci(false)
}

pub fn ci() -> RenderOptions {
    RenderOptions::default().with_ci(true)
}

pub fn debug() -> RenderOptions {
    RenderOptions::default().with_debug(true)
}
