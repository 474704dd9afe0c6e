//! Tabular data model and the chunk partitioner.
//!
//! A [`Dataset`] is headers plus rows of string cells, already decoded by
//! whatever produced it. Rows are 0-indexed internally; every index that
//! crosses the classifier boundary is the row's original 1-based position.

use serde::{Deserialize, Serialize};

/// A single row: ordered string cells, one per header.
pub type Row = Vec<String>;

/// Headers plus rows. Cell counts are assumed to match the header count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Borrow the rows covered by `span`.
    ///
    /// Spans produced by [`partition`] for this dataset always resolve; a
    /// foreign span is clamped to the rows that exist, and the returned
    /// chunk's span describes the clamped rows.
    pub fn chunk(&self, span: ChunkSpan) -> Chunk<'_> {
        let end = span.end().min(self.rows.len());
        let start = span.offset.min(end);
        Chunk {
            span: ChunkSpan {
                ordinal: span.ordinal,
                offset: start,
                len: end - start,
            },
            rows: &self.rows[start..end],
        }
    }

    /// Partition the rows into chunks of at most `chunk_size`.
    pub fn chunks(&self, chunk_size: usize) -> impl Iterator<Item = Chunk<'_>> {
        partition(self.rows.len(), chunk_size)
            .into_iter()
            .map(|span| self.chunk(span))
    }
}

/// Position of one chunk within the full row sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSpan {
    /// 0-based chunk number in dispatch order.
    pub ordinal: usize,
    /// 0-based position of the chunk's first row in the dataset.
    pub offset: usize,
    /// Number of rows in the chunk.
    pub len: usize,
}

impl ChunkSpan {
    /// Exclusive 0-based end position.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Smallest original 1-based index this chunk covers.
    pub fn first_index(&self) -> usize {
        self.offset + 1
    }

    /// Largest original 1-based index this chunk covers.
    pub fn last_index(&self) -> usize {
        self.offset + self.len
    }

    /// Whether `index` (original, 1-based) belongs to this chunk.
    pub fn contains_index(&self, index: usize) -> bool {
        index >= self.first_index() && index <= self.last_index()
    }
}

/// A borrowed contiguous slice of rows plus where it came from.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub span: ChunkSpan,
    pub rows: &'a [Row],
}

impl<'a> Chunk<'a> {
    /// Rows paired with their original 1-based index.
    pub fn indexed_rows(&self) -> impl Iterator<Item = (usize, &'a Row)> + '_ {
        let first = self.span.first_index();
        self.rows
            .iter()
            .enumerate()
            .map(move |(local, row)| (first + local, row))
    }
}

/// Split `row_count` rows into `ceil(row_count / chunk_size)` contiguous spans.
///
/// Offsets are `0, C, 2C, …`; only the last span may be shorter than `C`.
/// Zero rows produce zero spans. A `chunk_size` of 0 is treated as 1.
pub fn partition(row_count: usize, chunk_size: usize) -> Vec<ChunkSpan> {
    let size = chunk_size.max(1);
    (0..row_count.div_ceil(size))
        .map(|ordinal| {
            let offset = ordinal * size;
            ChunkSpan {
                ordinal,
                offset,
                len: size.min(row_count - offset),
            }
        })
        .collect()
}
