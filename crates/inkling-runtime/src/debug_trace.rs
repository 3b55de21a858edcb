#![forbid(unsafe_code)]

//! Scheduler tracing on stderr, switched on by environment variable.
//!
//! Set `INKLING_DEBUG_TRACE=1` to print every frame decision without
//! installing a `tracing` subscriber. Stderr is used so the trace never
//! interleaves with the stream being painted (usually stdout).
//!
//! Each line is one [`TraceEvent`] in fixed columns, so a burst of frames
//! reads as a table:
//!
//! ```text
//! [inkling     12ms] frame=    1 mode=interactive strategy=live_update  static=no  height=1
//! [inkling     14ms] defer instance=1 wait=30ms
//! [inkling     44ms] frame=    2 mode=interactive strategy=live_update  static=no  height=1
//! [inkling     51ms] unmount instance=1 reason=clean
//! ```

use std::fmt;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use crate::compositor::{FrameStrategy, RenderMode};

/// Environment variable enabling the trace.
pub const ENV_DEBUG_TRACE: &str = "INKLING_DEBUG_TRACE";

static DEBUG_TRACE_ENABLED: LazyLock<bool> = LazyLock::new(|| {
    std::env::var(ENV_DEBUG_TRACE)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
});

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Whether the stderr trace is enabled. Read once, then a bool load.
#[inline]
pub fn is_enabled() -> bool {
    *DEBUG_TRACE_ENABLED
}

/// Milliseconds since the first trace call.
#[inline]
pub fn elapsed_ms() -> u64 {
    START_TIME.elapsed().as_millis() as u64
}

/// A scheduler decision worth a trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// The compositor committed a frame.
    Frame {
        frame: u64,
        mode: RenderMode,
        strategy: FrameStrategy,
        has_static: bool,
        height: u16,
    },
    /// A throttled trigger landed inside the window.
    Deferred { instance: u64, wait: Duration },
    /// The instance unmounted.
    Unmount { instance: u64, error: bool },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Frame {
                frame,
                mode,
                strategy,
                has_static,
                height,
            } => write!(
                f,
                "frame={frame:>5} mode={:<11} strategy={:<12} static={:<3} height={height}",
                mode.as_str(),
                strategy.as_str(),
                if has_static { "yes" } else { "no" },
            ),
            Self::Deferred { instance, wait } => {
                write!(f, "defer instance={instance} wait={}ms", wait.as_millis())
            }
            Self::Unmount { instance, error } => write!(
                f,
                "unmount instance={instance} reason={}",
                if error { "error" } else { "clean" }
            ),
        }
    }
}

/// Print `event` to stderr, timestamped, when [`is_enabled`] is true.
#[inline]
pub fn emit(event: TraceEvent) {
    if is_enabled() {
        eprintln!("[inkling {:>6}ms] {event}", elapsed_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_monotonic() {
        let t1 = elapsed_ms();
        let t2 = elapsed_ms();
        assert!(t2 >= t1);
    }

    #[test]
    fn frame_lines_align_across_modes() {
        let line = |mode, strategy| {
            TraceEvent::Frame {
                frame: 3,
                mode,
                strategy,
                has_static: false,
                height: 1,
            }
            .to_string()
        };
        let interactive = line(RenderMode::Interactive, FrameStrategy::LiveUpdate);
        let ci = line(RenderMode::Ci, FrameStrategy::CiBuffered);
        assert_eq!(
            interactive,
            "frame=    3 mode=interactive strategy=live_update  static=no  height=1"
        );
        assert_eq!(interactive.find("strategy="), ci.find("strategy="));
        assert_eq!(interactive.find("height="), ci.find("height="));
    }

    #[test]
    fn static_commit_is_marked() {
        let event = TraceEvent::Frame {
            frame: 12,
            mode: RenderMode::Debug,
            strategy: FrameStrategy::DebugReplay,
            has_static: true,
            height: 4,
        };
        assert!(event.to_string().contains("static=yes"));
    }

    #[test]
    fn deferral_and_unmount_lines() {
        let defer = TraceEvent::Deferred {
            instance: 2,
            wait: Duration::from_millis(30),
        };
        assert_eq!(defer.to_string(), "defer instance=2 wait=30ms");
        let unmount = TraceEvent::Unmount {
            instance: 2,
            error: true,
        };
        assert_eq!(unmount.to_string(), "unmount instance=2 reason=error");
    }

    #[test]
    fn emit_does_not_panic() {
        emit(TraceEvent::Unmount {
            instance: 1,
            error: false,
        });
        let _ = is_enabled();
    }
}
