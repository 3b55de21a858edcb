#![forbid(unsafe_code)]

//! Rewrite-in-place region at the bottom of the stream.
//!
//! The updater remembers how many lines it last wrote. Each new write erases
//! exactly that many lines (moving upward from the cursor) and prints the new
//! block in the same chunk, so the region is replaced without flicker.
//!
//! # Contract
//!
//! 1. Every block is terminated with a newline; the cursor rests on the row
//!    below the region.
//! 2. Writing the block already on screen is a no-op.
//! 3. [`clear`](LineUpdater::clear) erases the region; later content written
//!    independently lands where the region was.
//! 4. [`done`](LineUpdater::done) leaves the current block in scrollback and
//!    starts a fresh region below it.
//!
//! The updater only knows about its own block. Anything written to the
//! stream beneath it must be preceded by a `clear`, or the next erase will
//! remove the wrong lines.

use std::io;

use inkling_core::ansi::{CURSOR_HIDE, CURSOR_SHOW, push_erase_lines};
use tracing::trace;

use crate::stream::OutputStream;

/// Rewrite-in-place line region.
#[derive(Debug, Default)]
pub struct LineUpdater {
    previous_output: String,
    previous_line_count: usize,
    cursor_hidden: bool,
}

impl LineUpdater {
    /// New updater with nothing on screen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the region with `text`.
    ///
    /// Returns `false` when `text` is already on screen and nothing was
    /// written.
    pub fn write<S: OutputStream + ?Sized>(&mut self, stream: &mut S, text: &str) -> io::Result<bool> {
        let mut output = String::with_capacity(text.len() + 1);
        output.push_str(text);
        output.push('\n');

        if output == self.previous_output {
            trace!(lines = self.previous_line_count, "line updater: unchanged block");
            return Ok(false);
        }

        let mut chunk = String::with_capacity(output.len() + self.previous_line_count * 8);
        if !self.cursor_hidden && stream.is_terminal() {
            chunk.push_str(CURSOR_HIDE);
            self.cursor_hidden = true;
        }
        push_erase_lines(&mut chunk, self.previous_line_count);
        chunk.push_str(&output);

        stream.write_chunk(&chunk)?;

        self.previous_line_count = output.split('\n').count();
        self.previous_output = output;
        trace!(lines = self.previous_line_count, "line updater: block written");
        Ok(true)
    }

    /// Erase the region.
    pub fn clear<S: OutputStream + ?Sized>(&mut self, stream: &mut S) -> io::Result<()> {
        if self.previous_line_count > 0 {
            let mut chunk = String::new();
            push_erase_lines(&mut chunk, self.previous_line_count);
            stream.write_chunk(&chunk)?;
        }
        self.previous_output.clear();
        self.previous_line_count = 0;
        Ok(())
    }

    /// Forget the block's text but keep its line count.
    ///
    /// Used after the screen was repainted behind the updater's back: the
    /// next write erases the recorded rows and prints its block even when
    /// the text equals the forgotten one.
    pub fn forget_output(&mut self) {
        self.previous_output.clear();
    }

    /// Leave the current block in scrollback and restore the cursor.
    pub fn done<S: OutputStream + ?Sized>(&mut self, stream: &mut S) -> io::Result<()> {
        self.previous_output.clear();
        self.previous_line_count = 0;
        if self.cursor_hidden {
            self.cursor_hidden = false;
            stream.write_chunk(CURSOR_SHOW)?;
        }
        Ok(())
    }

    /// Number of terminal lines the next write will erase.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.previous_line_count
    }

    /// Whether the cursor is currently hidden by this updater.
    #[inline]
    #[must_use]
    pub fn is_cursor_hidden(&self) -> bool {
        self.cursor_hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::CapturedStream;
    use inkling_core::geometry::TerminalSize;

    fn capture() -> CapturedStream {
        CapturedStream::new(TerminalSize::new(80, 24))
    }

    #[test]
    fn first_write_has_no_erase() {
        let mut stream = capture();
        let handle = stream.handle();
        let mut updater = LineUpdater::new();
        assert!(updater.write(&mut stream, "A").unwrap());
        assert_eq!(handle.writes(), vec!["A\n"]);
        assert_eq!(updater.line_count(), 2);
    }

    #[test]
    fn second_write_erases_previous_block() {
        let mut stream = capture();
        let handle = stream.handle();
        let mut updater = LineUpdater::new();
        updater.write(&mut stream, "A").unwrap();
        updater.write(&mut stream, "B").unwrap();
        assert_eq!(handle.last_write().unwrap(), "\x1b[2K\x1b[1A\x1b[2K\x1b[GB\n");
    }

    #[test]
    fn identical_write_is_skipped() {
        let mut stream = capture();
        let handle = stream.handle();
        let mut updater = LineUpdater::new();
        updater.write(&mut stream, "same").unwrap();
        assert!(!updater.write(&mut stream, "same").unwrap());
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn clear_erases_and_resets() {
        let mut stream = capture();
        let handle = stream.handle();
        let mut updater = LineUpdater::new();
        updater.write(&mut stream, "one\ntwo").unwrap();
        updater.clear(&mut stream).unwrap();
        assert_eq!(
            handle.last_write().unwrap(),
            "\x1b[2K\x1b[1A\x1b[2K\x1b[1A\x1b[2K\x1b[G"
        );
        assert_eq!(updater.line_count(), 0);
        // Same text again is written since the region was cleared.
        assert!(updater.write(&mut stream, "one\ntwo").unwrap());
        assert_eq!(handle.last_write().unwrap(), "one\ntwo\n");
    }

    #[test]
    fn clear_with_empty_region_writes_nothing() {
        let mut stream = capture();
        let handle = stream.handle();
        LineUpdater::new().clear(&mut stream).unwrap();
        assert_eq!(handle.write_count(), 0);
    }

    #[test]
    fn terminal_hides_then_shows_cursor() {
        let mut stream = capture().with_terminal(true);
        let handle = stream.handle();
        let mut updater = LineUpdater::new();
        updater.write(&mut stream, "A").unwrap();
        assert!(updater.is_cursor_hidden());
        updater.write(&mut stream, "B").unwrap();
        updater.done(&mut stream).unwrap();
        let writes = handle.writes();
        assert_eq!(writes[0], "\x1b[?25lA\n");
        assert!(!writes[1].contains(CURSOR_HIDE));
        assert_eq!(writes[2], CURSOR_SHOW);
    }

    #[test]
    fn done_starts_fresh_region() {
        let mut stream = capture();
        let handle = stream.handle();
        let mut updater = LineUpdater::new();
        updater.write(&mut stream, "A").unwrap();
        updater.done(&mut stream).unwrap();
        updater.write(&mut stream, "A").unwrap();
        assert_eq!(handle.writes(), vec!["A\n", "A\n"]);
    }

    #[test]
    fn forgotten_block_is_rewritten_over_same_rows() {
        let mut stream = capture();
        let handle = stream.handle();
        let mut updater = LineUpdater::new();
        updater.write(&mut stream, "A").unwrap();
        updater.forget_output();
        assert_eq!(updater.line_count(), 2);
        assert!(updater.write(&mut stream, "A").unwrap());
        assert_eq!(handle.last_write().unwrap(), "\x1b[2K\x1b[1A\x1b[2K\x1b[GA\n");
    }
}
