#![forbid(unsafe_code)]

//! Terminal geometry.

/// Size of a terminal viewport in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalSize {
    /// Width in columns.
    pub columns: u16,
    /// Height in rows.
    pub rows: u16,
}

impl TerminalSize {
    /// Fallback used when a terminal does not report its size.
    pub const FALLBACK: Self = Self::new(80, 24);

    /// Row count of a stream with no viewport (a pipe or a file).
    pub const UNBOUNDED_ROWS: u16 = u16::MAX;

    /// Create a new size.
    #[inline]
    pub const fn new(columns: u16, rows: u16) -> Self {
        Self { columns, rows }
    }

    /// Size of a stream that is not a terminal: nothing ever scrolls out of
    /// view, so no height overflows it.
    #[inline]
    #[must_use]
    pub const fn unbounded(columns: u16) -> Self {
        Self::new(columns, Self::UNBOUNDED_ROWS)
    }

    /// Whether the size has a real row count.
    #[inline]
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.rows != Self::UNBOUNDED_ROWS
    }

    /// Query the controlling terminal.
    ///
    /// Returns `None` when no terminal is attached or the size is reported
    /// as zero (some CI runners do this).
    #[cfg(not(target_arch = "wasm32"))]
    #[must_use]
    pub fn detect() -> Option<Self> {
        match crossterm::terminal::size() {
            Ok((columns, rows)) if columns > 0 && rows > 0 => Some(Self::new(columns, rows)),
            _ => None,
        }
    }

    /// Query the controlling terminal.
    #[cfg(target_arch = "wasm32")]
    #[must_use]
    pub fn detect() -> Option<Self> {
        None
    }

    /// Whether `height` rows would not fit in the viewport.
    ///
    /// A region exactly as tall as the viewport counts as not fitting: the
    /// trailing newline after the last row would scroll the first row away.
    /// Unbounded sizes never overflow.
    #[inline]
    #[must_use]
    pub const fn overflows(&self, height: u16) -> bool {
        self.is_bounded() && height >= self.rows
    }
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self::FALLBACK
    }
}
