/// Byte offset up to which the log has been consumed.
///
/// Only moves forward, except when the file shrinks below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    offset: u64,
}

/// How the file length compares to the cursor on a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Grown { from: u64, to: u64 },
    Truncated { from: u64, to: u64 },
    Unchanged,
}

impl Cursor {
    pub fn new(offset: u64) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn observe(&self, file_len: u64) -> CursorMove {
        if file_len < self.offset {
            CursorMove::Truncated {
                from: self.offset,
                to: file_len,
            }
        } else if file_len > self.offset {
            CursorMove::Grown {
                from: self.offset,
                to: file_len,
            }
        } else {
            CursorMove::Unchanged
        }
    }

    pub fn advance_to(&mut self, offset: u64) {
        debug_assert!(offset >= self.offset, "cursor moved backwards");
        self.offset = offset.max(self.offset);
    }

    /// Skips straight to the new end of a truncated file; the stale range is
    /// never reprocessed.
    pub fn reset_to(&mut self, file_len: u64) {
        self.offset = file_len;
    }
}
