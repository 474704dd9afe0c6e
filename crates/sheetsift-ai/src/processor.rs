//! Chunk processor: one chunk + query in, one [`ChunkOutcome`] out.
//!
//! Classifier and parse failures become data on the outcome; nothing here
//! returns an error to the caller.

use sheetsift_core::{ChunkSpan, Dataset, QueryConfig};
use thiserror::Error;
use tracing::{debug, warn};

use crate::response::{Rejection, parse_response};
use crate::{Classifier, ClassifierError, ResponseError, prompt};

const LOG_PREVIEW_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("classifier call failed: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("malformed classifier response: {0}")]
    Response(#[from] ResponseError),
    #[error("chunk task aborted: {0}")]
    Aborted(String),
}

/// Lifecycle of one chunk job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl ChunkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Terminal status of a chunk job.
#[derive(Debug)]
pub enum ChunkStatus {
    /// Validated original 1-based indices.
    Succeeded(Vec<usize>),
    Failed(ChunkError),
}

/// Settled result of one chunk job.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub span: ChunkSpan,
    pub status: ChunkStatus,
    /// Candidates dropped during validation.
    pub rejected: Vec<Rejection>,
    /// Indices were scanned out of free text rather than a JSON array.
    pub salvaged: bool,
}

impl ChunkOutcome {
    pub fn failed(span: ChunkSpan, error: ChunkError) -> Self {
        Self {
            span,
            status: ChunkStatus::Failed(error),
            rejected: Vec::new(),
            salvaged: false,
        }
    }

    pub fn state(&self) -> ChunkState {
        match self.status {
            ChunkStatus::Succeeded(_) => ChunkState::Succeeded,
            ChunkStatus::Failed(_) => ChunkState::Failed,
        }
    }

    /// Indices from a successful chunk; empty for a failed one.
    pub fn indices(&self) -> &[usize] {
        match &self.status {
            ChunkStatus::Succeeded(indices) => indices,
            ChunkStatus::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&ChunkError> {
        match &self.status {
            ChunkStatus::Succeeded(_) => None,
            ChunkStatus::Failed(e) => Some(e),
        }
    }
}

/// Render, classify, parse and validate one chunk.
pub async fn process_chunk(
    classifier: &dyn Classifier,
    config: &QueryConfig,
    query: &str,
    dataset: &Dataset,
    span: ChunkSpan,
) -> ChunkOutcome {
    let chunk_no = span.ordinal + 1;
    let chunk = dataset.chunk(span);
    if chunk.span != span {
        warn!(
            chunk = chunk_no,
            requested = span.len,
            available = chunk.span.len,
            "span extends past the dataset, clamping"
        );
    }
    let span = chunk.span;
    let prompt = prompt::render(query, &dataset.headers, &chunk, config.relevance_threshold);

    debug!(
        chunk = chunk_no,
        rows = span.len,
        first_index = span.first_index(),
        state = ChunkState::Running.as_str(),
        "dispatching chunk"
    );

    let raw = match classifier.classify(&config.model_id, &prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(chunk = chunk_no, error = %e, "classifier call failed");
            return ChunkOutcome::failed(span, e.into());
        }
    };
    debug!(chunk = chunk_no, raw = %preview(&raw), "raw classifier response");

    let parsed = match parse_response(&raw, &span) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(chunk = chunk_no, error = %e, raw = %preview(&raw), "failed to parse classifier response");
            return ChunkOutcome::failed(span, e.into());
        }
    };

    if parsed.salvaged {
        warn!(
            chunk = chunk_no,
            found = parsed.indices.len() + parsed.rejected.len(),
            "response was not a JSON array, scanned text for indices"
        );
    }
    for rejection in &parsed.rejected {
        warn!(
            chunk = chunk_no,
            first_index = span.first_index(),
            last_index = span.last_index(),
            ?rejection,
            "dropping invalid index"
        );
    }
    debug!(chunk = chunk_no, indices = ?parsed.indices, "validated indices");

    ChunkOutcome {
        span,
        status: ChunkStatus::Succeeded(parsed.indices),
        rejected: parsed.rejected,
        salvaged: parsed.salvaged,
    }
}

fn preview(raw: &str) -> &str {
    match raw.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((end, _)) => &raw[..end],
        None => raw,
    }
}
