#![forbid(unsafe_code)]

//! Output compositor: turns frames into stream writes.
//!
//! The compositor is the only component that writes frames to the stream.
//! Given a [`FrameOutput`] it picks one write strategy, evaluated in order:
//!
//! 1. **Unmounted**: nothing is written once teardown has begun.
//! 2. **Debug**: static history plus the live region, re-emitted in full on
//!    every frame so any single write reproduces the whole session.
//! 3. **CI**: new static content is appended directly; the live region is
//!    only buffered and written once, at unmount.
//! 4. **Interactive**:
//!    - a live region at least as tall as the terminal forces a full clear
//!      and repaint of history plus live region in one write;
//!    - otherwise new static content is written above the live region
//!      (after erasing it), and the live region is rewritten in place when
//!      it differs from the last one written.
//!
//! # Invariants
//!
//! - Writes follow frame commit order; a frame's static content is written
//!   before (or together with) its live region.
//! - Two consecutive frames with equal live output produce no live-region
//!   write for the second one (interactive mode).
//! - The static history is append-only, in every mode.
//! - The unmounted flag never goes back to false.

use std::io;

use inkling_core::ansi::CLEAR_TERMINAL;
use inkling_core::geometry::TerminalSize;
use tracing::{debug, debug_span, trace};

use crate::debug_trace::{self, TraceEvent};
use crate::frame::FrameOutput;
use crate::line_updater::LineUpdater;
use crate::static_output::StaticAccumulator;
use crate::stream::OutputStream;

/// Rendering mode, fixed when an instance is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Full re-emission on every frame, no throttling.
    Debug,
    /// Non-interactive log output: static content streamed, live region
    /// flushed once at unmount.
    Ci,
    /// Throttled in-place rewriting.
    #[default]
    Interactive,
}

impl RenderMode {
    /// Pick the mode from the debug flag and CI detection. Debug wins.
    #[must_use]
    pub const fn resolve(debug: bool, ci: bool) -> Self {
        if debug {
            Self::Debug
        } else if ci {
            Self::Ci
        } else {
            Self::Interactive
        }
    }

    /// Whether regular triggers go through the throttle in this mode.
    #[inline]
    #[must_use]
    pub const fn is_throttled(self) -> bool {
        matches!(self, Self::Interactive)
    }

    /// Stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Ci => "ci",
            Self::Interactive => "interactive",
        }
    }
}

/// How a frame was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStrategy {
    /// Instance already unmounted; nothing written.
    Skipped,
    /// Debug mode: history plus live region written in full.
    DebugReplay,
    /// CI mode: live region buffered for unmount.
    CiBuffered,
    /// Live region did not fit; terminal cleared and repainted.
    FullRepaint,
    /// Live region rewritten in place.
    LiveUpdate,
    /// Live region equal to the last one; not written.
    Unchanged,
}

impl FrameStrategy {
    /// Stable string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::DebugReplay => "debug_replay",
            Self::CiBuffered => "ci_buffered",
            Self::FullRepaint => "full_repaint",
            Self::LiveUpdate => "live_update",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Outcome of one compositor pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeReport {
    /// Strategy applied to the live region.
    pub strategy: FrameStrategy,
    /// Whether the frame carried new static content.
    pub static_committed: bool,
}

impl CompositeReport {
    const SKIPPED: Self = Self {
        strategy: FrameStrategy::Skipped,
        static_committed: false,
    };
}

/// Mutable scheduling state owned by one mounted instance.
#[derive(Debug, Default)]
pub struct SchedulerState {
    mode: RenderMode,
    unmounted: bool,
    last_output: String,
    full_static: StaticAccumulator,
}

impl SchedulerState {
    /// Fresh state for `mode`.
    #[must_use]
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Mode fixed at construction.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Whether teardown has begun.
    #[inline]
    #[must_use]
    pub fn is_unmounted(&self) -> bool {
        self.unmounted
    }

    /// Most recent live region written (or buffered, in CI mode).
    #[inline]
    #[must_use]
    pub fn last_output(&self) -> &str {
        &self.last_output
    }

    /// Every static chunk committed so far.
    #[inline]
    #[must_use]
    pub fn full_static_output(&self) -> &str {
        self.full_static.as_str()
    }

    /// The static history.
    #[inline]
    #[must_use]
    pub fn static_history(&self) -> &StaticAccumulator {
        &self.full_static
    }
}

/// Frame-to-stream compositor.
#[derive(Debug)]
pub struct Compositor<S: OutputStream> {
    stream: S,
    state: SchedulerState,
    updater: LineUpdater,
    frames: u64,
}

impl<S: OutputStream> Compositor<S> {
    /// Compositor writing to `stream` in `mode`.
    pub fn new(stream: S, mode: RenderMode) -> Self {
        Self {
            stream,
            state: SchedulerState::new(mode),
            updater: LineUpdater::new(),
            frames: 0,
        }
    }

    /// Write one frame.
    pub fn composite(&mut self, frame: &FrameOutput) -> io::Result<CompositeReport> {
        if self.state.unmounted {
            trace!("composite skipped: unmounted");
            return Ok(CompositeReport::SKIPPED);
        }

        self.frames += 1;
        let _span = debug_span!(
            "composite",
            frame = self.frames,
            mode = self.state.mode.as_str()
        )
        .entered();

        let has_static = frame.has_static();
        let strategy = match self.state.mode {
            RenderMode::Debug => self.composite_debug(frame, has_static)?,
            RenderMode::Ci => self.composite_ci(frame, has_static)?,
            RenderMode::Interactive => self.composite_interactive(frame, has_static)?,
        };

        trace!(
            strategy = strategy.as_str(),
            has_static,
            height = frame.output_height,
            "frame committed"
        );
        debug_trace::emit(TraceEvent::Frame {
            frame: self.frames,
            mode: self.state.mode,
            strategy,
            has_static,
            height: frame.output_height,
        });

        Ok(CompositeReport {
            strategy,
            static_committed: has_static,
        })
    }

    fn composite_debug(&mut self, frame: &FrameOutput, has_static: bool) -> io::Result<FrameStrategy> {
        if has_static {
            self.state.full_static.push(&frame.static_output);
        }
        let chunk = self.state.full_static.with_live(&frame.output);
        self.stream.write_chunk(&chunk)?;
        Ok(FrameStrategy::DebugReplay)
    }

    fn composite_ci(&mut self, frame: &FrameOutput, has_static: bool) -> io::Result<FrameStrategy> {
        if has_static {
            self.stream.write_chunk(&frame.static_output)?;
            self.state.full_static.push(&frame.static_output);
        }
        self.state.last_output.clone_from(&frame.output);
        Ok(FrameStrategy::CiBuffered)
    }

    fn composite_interactive(
        &mut self,
        frame: &FrameOutput,
        has_static: bool,
    ) -> io::Result<FrameStrategy> {
        if has_static {
            self.state.full_static.push(&frame.static_output);
        }

        let size = self.stream.size();
        if size.overflows(frame.output_height) {
            debug!(
                height = frame.output_height,
                rows = size.rows,
                "live region taller than terminal, repainting"
            );
            let mut chunk = String::with_capacity(
                CLEAR_TERMINAL.len() + self.state.full_static.len() + frame.output.len(),
            );
            chunk.push_str(CLEAR_TERMINAL);
            chunk.push_str(self.state.full_static.as_str());
            chunk.push_str(&frame.output);
            self.stream.write_chunk(&chunk)?;
            // The screen no longer shows the updater's block; keep its line
            // count so the next in-place write erases the same rows.
            self.updater.forget_output();
            self.state.last_output.clone_from(&frame.output);
            return Ok(FrameStrategy::FullRepaint);
        }

        if has_static {
            // The erased region no longer shows the last output, so the live
            // region must be redrawn below the static chunk even if unchanged.
            self.updater.clear(&mut self.stream)?;
            self.state.last_output.clear();
            self.stream.write_chunk(&frame.static_output)?;
        }

        if frame.output == self.state.last_output {
            return Ok(FrameStrategy::Unchanged);
        }

        let written = self.updater.write(&mut self.stream, &frame.output)?;
        self.state.last_output.clone_from(&frame.output);
        Ok(if written {
            FrameStrategy::LiveUpdate
        } else {
            FrameStrategy::Unchanged
        })
    }

    /// Final mode-specific write, then mark the state unmounted.
    ///
    /// CI mode flushes the buffered live region with a trailing newline;
    /// interactive mode leaves the live region in scrollback and restores
    /// the cursor. Later calls are no-ops.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.state.unmounted {
            return Ok(());
        }
        let result = match self.state.mode {
            RenderMode::Ci => {
                let mut chunk = String::with_capacity(self.state.last_output.len() + 1);
                chunk.push_str(&self.state.last_output);
                chunk.push('\n');
                self.stream.write_chunk(&chunk)
            }
            RenderMode::Interactive => self.updater.done(&mut self.stream),
            RenderMode::Debug => Ok(()),
        };
        self.state.unmounted = true;
        debug!(mode = self.state.mode.as_str(), frames = self.frames, "compositor finished");
        result
    }

    /// Erase the live region (interactive mode only).
    pub fn clear(&mut self) -> io::Result<()> {
        if self.state.unmounted || self.state.mode != RenderMode::Interactive {
            return Ok(());
        }
        self.updater.clear(&mut self.stream)?;
        self.state.last_output.clear();
        Ok(())
    }

    /// Scheduling state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Mode fixed at construction.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> RenderMode {
        self.state.mode
    }

    /// Whether teardown has begun.
    #[inline]
    #[must_use]
    pub fn is_unmounted(&self) -> bool {
        self.state.unmounted
    }

    /// Current size of the underlying stream.
    #[must_use]
    pub fn size(&self) -> TerminalSize {
        self.stream.size()
    }

    /// The underlying stream.
    #[inline]
    #[must_use]
    pub fn stream(&self) -> &S {
        &self.stream
    }

    /// Frames composited so far (skipped frames excluded).
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{CaptureHandle, CapturedStream};

    fn compositor(mode: RenderMode, rows: u16) -> (Compositor<CapturedStream>, CaptureHandle) {
        let stream = CapturedStream::new(TerminalSize::new(80, rows));
        let handle = stream.handle();
        (Compositor::new(stream, mode), handle)
    }

    #[test]
    fn mode_resolution_prefers_debug() {
        assert_eq!(RenderMode::resolve(true, true), RenderMode::Debug);
        assert_eq!(RenderMode::resolve(false, true), RenderMode::Ci);
        assert_eq!(RenderMode::resolve(false, false), RenderMode::Interactive);
        assert!(RenderMode::Interactive.is_throttled());
        assert!(!RenderMode::Debug.is_throttled());
        assert!(!RenderMode::Ci.is_throttled());
    }

    #[test]
    fn debug_reemits_history_every_frame() {
        let (mut c, out) = compositor(RenderMode::Debug, 24);
        c.composite(&FrameOutput::with_static("X", 1, "Log1\n")).unwrap();
        c.composite(&FrameOutput::live("Y", 1)).unwrap();
        c.composite(&FrameOutput::live("Y", 1)).unwrap();
        assert_eq!(out.writes(), vec!["Log1\nX", "Log1\nY", "Log1\nY"]);
        assert_eq!(c.state().full_static_output(), "Log1\n");
    }

    #[test]
    fn ci_streams_static_and_buffers_live() {
        let (mut c, out) = compositor(RenderMode::Ci, 24);
        c.composite(&FrameOutput::live("A", 1)).unwrap();
        c.composite(&FrameOutput::with_static("B", 1, "done\n")).unwrap();
        assert_eq!(out.writes(), vec!["done\n"]);
        assert_eq!(c.state().last_output(), "B");
        c.finish().unwrap();
        assert_eq!(out.contents(), "done\nB\n");
    }

    #[test]
    fn ci_finish_without_frames_writes_newline() {
        let (mut c, out) = compositor(RenderMode::Ci, 24);
        c.finish().unwrap();
        assert_eq!(out.contents(), "\n");
    }

    #[test]
    fn interactive_suppresses_equal_frames() {
        let (mut c, out) = compositor(RenderMode::Interactive, 24);
        let first = c.composite(&FrameOutput::live("A", 1)).unwrap();
        let second = c.composite(&FrameOutput::live("A", 1)).unwrap();
        assert_eq!(first.strategy, FrameStrategy::LiveUpdate);
        assert_eq!(second.strategy, FrameStrategy::Unchanged);
        assert_eq!(out.write_count(), 1);
    }

    #[test]
    fn interactive_static_lands_above_live_region() {
        let (mut c, out) = compositor(RenderMode::Interactive, 24);
        c.composite(&FrameOutput::live("live", 1)).unwrap();
        let report = c
            .composite(&FrameOutput::with_static("live", 1, "log\n"))
            .unwrap();
        assert!(report.static_committed);
        assert_eq!(report.strategy, FrameStrategy::LiveUpdate);
        assert_eq!(
            out.writes(),
            vec![
                "live\n".to_string(),
                "\x1b[2K\x1b[1A\x1b[2K\x1b[G".to_string(),
                "log\n".to_string(),
                "live\n".to_string(),
            ]
        );
    }

    #[test]
    fn overflow_clears_terminal_in_one_write() {
        let (mut c, out) = compositor(RenderMode::Interactive, 10);
        c.composite(&FrameOutput::with_static("small", 1, "hist\n")).unwrap();
        out.clear();

        let tall: String = (0..20).map(|i| format!("line {i}\n")).collect();
        let report = c.composite(&FrameOutput::live(tall.clone(), 20)).unwrap();
        assert_eq!(report.strategy, FrameStrategy::FullRepaint);
        assert_eq!(out.writes(), vec![format!("{CLEAR_TERMINAL}hist\n{tall}")]);
        assert_eq!(c.state().last_output(), tall);
    }

    #[test]
    fn frame_after_overflow_is_rewritten_even_if_seen_before() {
        let (mut c, out) = compositor(RenderMode::Interactive, 5);
        c.composite(&FrameOutput::live("A", 1)).unwrap();
        let tall: String = (0..6).map(|i| format!("row {i}\n")).collect();
        c.composite(&FrameOutput::live(tall, 6)).unwrap();
        out.clear();

        let report = c.composite(&FrameOutput::live("A", 1)).unwrap();
        assert_eq!(report.strategy, FrameStrategy::LiveUpdate);
        assert_eq!(out.writes(), vec!["\x1b[2K\x1b[1A\x1b[2K\x1b[GA\n"]);
        assert_eq!(c.state().last_output(), "A");
    }

    #[test]
    fn unbounded_stream_never_clears() {
        let stream = CapturedStream::new(TerminalSize::unbounded(80));
        let out = stream.handle();
        let mut c = Compositor::new(stream, RenderMode::Interactive);
        let tall: String = (0..40).map(|i| format!("row {i}\n")).collect();
        let report = c.composite(&FrameOutput::live(tall, 40)).unwrap();
        assert_eq!(report.strategy, FrameStrategy::LiveUpdate);
        assert!(!out.contents().contains(CLEAR_TERMINAL));
    }

    #[test]
    fn height_equal_to_rows_overflows() {
        let (mut c, out) = compositor(RenderMode::Interactive, 3);
        let report = c.composite(&FrameOutput::live("a\nb\nc", 3)).unwrap();
        assert_eq!(report.strategy, FrameStrategy::FullRepaint);
        assert!(out.last_write().unwrap().starts_with(CLEAR_TERMINAL));
    }

    #[test]
    fn finish_blocks_further_frames() {
        let (mut c, out) = compositor(RenderMode::Interactive, 24);
        c.composite(&FrameOutput::live("A", 1)).unwrap();
        c.finish().unwrap();
        assert!(c.is_unmounted());
        let report = c.composite(&FrameOutput::live("B", 1)).unwrap();
        assert_eq!(report.strategy, FrameStrategy::Skipped);
        assert_eq!(out.writes(), vec!["A\n"]);
        c.finish().unwrap();
        assert_eq!(out.write_count(), 1);
    }

    #[test]
    fn clear_erases_live_region_and_forgets_it() {
        let (mut c, out) = compositor(RenderMode::Interactive, 24);
        c.composite(&FrameOutput::live("A", 1)).unwrap();
        c.clear().unwrap();
        assert_eq!(out.last_write().unwrap(), "\x1b[2K\x1b[1A\x1b[2K\x1b[G");
        c.composite(&FrameOutput::live("A", 1)).unwrap();
        assert_eq!(out.last_write().unwrap(), "A\n");
    }

    #[test]
    fn clear_is_inert_outside_interactive() {
        let (mut c, out) = compositor(RenderMode::Debug, 24);
        c.composite(&FrameOutput::live("A", 1)).unwrap();
        c.clear().unwrap();
        assert_eq!(out.write_count(), 1);
    }
}
