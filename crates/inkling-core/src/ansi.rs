#![forbid(unsafe_code)]

//! Escape sequences for in-place line rewriting and full-terminal clears.
//!
//! Only the handful of sequences the compositor emits live here. Styling is
//! the renderer's business and never passes through this module.
//!
//! # Sequence Reference
//!
//! | Sequence | Description |
//! |----------|-------------|
//! | `ESC [ 2 K` | EL: erase entire line |
//! | `ESC [ 1 A` | CUU: cursor up one row |
//! | `ESC [ G` | CHA: cursor to column 1 |
//! | `ESC [ 2 J` `ESC [ 3 J` `ESC [ H` | Clear screen, purge scrollback, home |
//! | `ESC [ ? 25 l/h` | DECTCEM: hide/show cursor |

/// Erase entire line (CSI 2 K).
pub const ERASE_LINE: &str = "\x1b[2K";

/// Move cursor up one row (CSI 1 A).
pub const CURSOR_UP: &str = "\x1b[1A";

/// Move cursor to the first column (CSI G).
pub const CURSOR_LEFT: &str = "\x1b[G";

/// Clear the visible screen, purge scrollback and home the cursor.
pub const CLEAR_TERMINAL: &str = "\x1b[2J\x1b[3J\x1b[H";

/// Hide the cursor (DECTCEM reset).
pub const CURSOR_HIDE: &str = "\x1b[?25l";

/// Show the cursor (DECTCEM set).
pub const CURSOR_SHOW: &str = "\x1b[?25h";

/// Append the sequence that erases `count` lines upward from the cursor.
///
/// Each line is erased, moving up between lines, and the cursor finishes in
/// the first column of the topmost erased line. `count == 0` appends nothing.
pub fn push_erase_lines(buf: &mut String, count: usize) {
    for i in 0..count {
        buf.push_str(ERASE_LINE);
        if i + 1 < count {
            buf.push_str(CURSOR_UP);
        }
    }
    if count > 0 {
        buf.push_str(CURSOR_LEFT);
    }
}

/// Sequence that erases `count` lines upward from the cursor.
#[must_use]
pub fn erase_lines(count: usize) -> String {
    let mut buf = String::with_capacity(count * (ERASE_LINE.len() + CURSOR_UP.len()));
    push_erase_lines(&mut buf, count);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erase_zero_lines_is_empty() {
        assert_eq!(erase_lines(0), "");
    }

    #[test]
    fn erase_one_line() {
        assert_eq!(erase_lines(1), "\x1b[2K\x1b[G");
    }

    #[test]
    fn erase_three_lines_moves_up_between_erases() {
        assert_eq!(
            erase_lines(3),
            "\x1b[2K\x1b[1A\x1b[2K\x1b[1A\x1b[2K\x1b[G"
        );
    }

    #[test]
    fn push_appends_to_existing_buffer() {
        let mut buf = String::from("x");
        push_erase_lines(&mut buf, 2);
        assert_eq!(buf, "x\x1b[2K\x1b[1A\x1b[2K\x1b[G");
    }

    #[test]
    fn clear_terminal_homes_cursor_last() {
        assert!(CLEAR_TERMINAL.ends_with("\x1b[H"));
    }
}
