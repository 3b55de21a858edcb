#![forbid(unsafe_code)]

//! Inkling Runtime
//!
//! Frame scheduling and output compositing for declarative terminal UIs.
//! A scene tree reports mutations, the runtime decides when to paint, and
//! the compositor decides how the painted frame reaches the stream.
//!
//! # Key Components
//!
//! - [`FrameTriggers`] - Mutation hooks wired into the scene tree
//! - [`RenderThrottle`] - 32 ms leading + trailing throttle
//! - [`Compositor`] - Debug, CI and interactive write strategies
//! - [`StaticAccumulator`] - Append-only history of permanent output
//! - [`LineUpdater`] - In-place rewriting of the live region
//! - [`Instance`] / [`Ink`] - Mounted tree with its lifecycle
//! - [`ExitSignal`] - Settles once, when the instance unmounts
//! - [`StreamRegistry`] - One instance per output stream
//!
//! # Role in Inkling
//! `inkling-runtime` sits between a retained scene tree (reconciler side)
//! and an output stream. It never inspects the tree; everything it needs
//! comes through the [`SceneTree`] and [`Renderer`] traits.

pub mod compositor;
pub mod debug_trace;
pub mod error;
pub mod exit;
pub mod frame;
pub mod instance;
pub mod line_updater;
pub mod registry;
pub mod static_output;
pub mod stream;
pub mod throttle;
pub mod triggers;

pub use compositor::{CompositeReport, Compositor, FrameStrategy, RenderMode, SchedulerState};
pub use error::{Error, Result};
pub use exit::{ExitError, ExitOutcome, ExitReason, ExitResolver, ExitSignal};
pub use frame::{EMPTY_STATIC, FrameOutput, RenderContext, Renderer, SceneTree};
pub use instance::{Ink, Instance, Lifecycle, RenderOptions, render};
pub use line_updater::LineUpdater;
pub use registry::{InstanceId, StreamRegistry};
pub use static_output::StaticAccumulator;
pub use stream::{
    CaptureHandle, CapturedStream, OutputStream, StderrStream, StdoutStream, StreamId,
    WriterStream,
};
pub use throttle::{RenderThrottle, ThrottleAction, ThrottleConfig, ThrottleStats};
pub use triggers::{FrameTriggers, TriggerRequest};
