#![forbid(unsafe_code)]

//! Core: execution environment detection, terminal geometry, and the escape
//! sequences used by the output compositor.

pub mod ansi;
pub mod environment;
pub mod geometry;
