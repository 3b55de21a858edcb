#![forbid(unsafe_code)]

//! Inkling public facade crate.
//!
//! Re-exports the environment helpers from `inkling-core` and the frame
//! runtime from `inkling-runtime`, plus a prelude for day-to-day usage.

// --- Core re-exports -------------------------------------------------------

pub use inkling_core::environment::Environment;
pub use inkling_core::geometry::TerminalSize;

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use inkling_runtime::{
    CapturedStream, Error, ExitError, ExitOutcome, ExitReason, ExitSignal, FrameOutput,
    FrameTriggers, Ink, Instance, OutputStream, RenderContext, RenderMode, RenderOptions,
    Renderer, Result, SceneTree, StderrStream, StdoutStream, StreamId, StreamRegistry,
    ThrottleConfig, WriterStream, render,
};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{Environment, TerminalSize};

    #[cfg(feature = "runtime")]
    pub use crate::{
        Error, ExitReason, ExitSignal, FrameOutput, FrameTriggers, Ink, OutputStream,
        RenderContext, RenderOptions, Renderer, Result, SceneTree, StdoutStream, render,
    };

    pub use crate::core;
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use inkling_core as core;
#[cfg(feature = "runtime")]
pub use inkling_runtime as runtime;
