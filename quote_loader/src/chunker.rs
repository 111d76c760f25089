//! Splits long load windows into calendar-month chunks.

use std::ops::Deref;

use crate::models::date_range::DateRange;

/// Ranges spanning at most this many days are never split.
pub const MAX_SINGLE_CHUNK_DAYS: i64 = 31;

/// One unit of work for the collectors.
///
/// A split range yields chunks confined to a single calendar month; an unsplit range
/// is a single chunk equal to the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk(DateRange);

impl Chunk {
    pub fn range(&self) -> DateRange {
        self.0
    }
}

impl Deref for Chunk {
    type Target = DateRange;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Chunk> for DateRange {
    fn from(chunk: Chunk) -> Self {
        chunk.0
    }
}

/// Splits `range` into the chunks that are processed one after another.
pub fn split(range: DateRange) -> Vec<Chunk> {
    if range.span_days() <= MAX_SINGLE_CHUNK_DAYS {
        return vec![Chunk(range)];
    }

    let mut chunks = Vec::new();
    let mut rest = Some(range);
    while let Some(current) = rest {
        let (head, tail) = current.split_at_month_end();
        chunks.push(Chunk(head));
        rest = tail;
    }
    chunks
}
