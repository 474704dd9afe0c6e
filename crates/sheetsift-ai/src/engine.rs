//! Scatter-gather coordinator.
//!
//! Partitions the dataset, spawns one task per chunk, waits for every task
//! to settle, merges the successful index sets and projects them back onto
//! the rows. A failed chunk only ever removes matches; it never aborts its
//! siblings or the query.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use sheetsift_core::{ConfigError, Dataset, QueryConfig, Row, aggregate, partition, project};
use tracing::{debug, info, warn};

use crate::Classifier;
use crate::processor::{ChunkError, ChunkOutcome, ChunkState, process_chunk};

/// Why a query returned without dispatching any chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortCircuit {
    /// Empty query: every row is returned unfiltered.
    EmptyQuery,
    /// No rows: nothing to classify.
    EmptyDataset,
}

/// Diagnostics for one query invocation.
#[derive(Debug)]
pub struct QueryReport {
    pub total_rows: usize,
    pub short_circuit: Option<ShortCircuit>,
    /// One outcome per chunk, in chunk order.
    pub chunks: Vec<ChunkOutcome>,
    /// Aggregated index set: deduplicated, ascending.
    pub indices: Vec<usize>,
    pub completed_at: DateTime<Utc>,
}

impl QueryReport {
    fn short_circuit(reason: ShortCircuit, total_rows: usize) -> Self {
        Self {
            total_rows,
            short_circuit: Some(reason),
            chunks: Vec::new(),
            indices: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| c.state() == ChunkState::Succeeded)
            .count()
    }

    /// Failed chunks with their reasons.
    pub fn failed(&self) -> impl Iterator<Item = (&ChunkOutcome, &ChunkError)> {
        self.chunks
            .iter()
            .filter_map(|c| c.error().map(|e| (c, e)))
    }

    /// At least one chunk failed, so the result may be missing matches.
    pub fn is_degraded(&self) -> bool {
        self.failed().next().is_some()
    }
}

/// Filtered rows plus diagnostics.
#[derive(Debug)]
pub struct QueryResult {
    /// Matching rows in ascending original index order.
    pub rows: Vec<Row>,
    pub report: QueryReport,
}

/// Runs natural-language relevance queries against datasets.
pub struct RelevanceEngine {
    classifier: Arc<dyn Classifier>,
    config: Arc<QueryConfig>,
}

impl RelevanceEngine {
    pub fn new(classifier: Arc<dyn Classifier>, config: QueryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            classifier,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Rows of `dataset` relevant to `query`.
    pub async fn filter_rows(&self, query: &str, dataset: Arc<Dataset>) -> Vec<Row> {
        self.run_query(query, dataset).await.rows
    }

    /// Run `query` against `dataset`.
    ///
    /// An empty query returns every row unmodified
    /// without contacting the classifier. Does not return until every
    /// chunk task has settled.
    pub async fn run_query(&self, query: &str, dataset: Arc<Dataset>) -> QueryResult {
        let total_rows = dataset.len();

        if query.is_empty() {
            info!(rows = total_rows, "empty query, returning all rows");
            return QueryResult {
                rows: dataset.rows.clone(),
                report: QueryReport::short_circuit(ShortCircuit::EmptyQuery, total_rows),
            };
        }

        let spans = partition(total_rows, self.config.chunk_size);
        if spans.is_empty() {
            info!("no rows to process");
            return QueryResult {
                rows: Vec::new(),
                report: QueryReport::short_circuit(ShortCircuit::EmptyDataset, 0),
            };
        }

        info!(
            rows = total_rows,
            chunks = spans.len(),
            chunk_size = self.config.chunk_size,
            model = %self.config.model_id,
            "splitting rows into chunks"
        );

        let query: Arc<str> = Arc::from(query);
        let handles: Vec<_> = spans
            .iter()
            .map(|&span| {
                debug!(
                    chunk = span.ordinal + 1,
                    state = ChunkState::Pending.as_str(),
                    "queueing chunk"
                );
                let classifier = Arc::clone(&self.classifier);
                let config = Arc::clone(&self.config);
                let dataset = Arc::clone(&dataset);
                let query = Arc::clone(&query);
                tokio::spawn(async move {
                    process_chunk(classifier.as_ref(), &config, &query, &dataset, span).await
                })
            })
            .collect();

        // Settle-all: each handle fills its own slot, in chunk order.
        let chunks: Vec<ChunkOutcome> = join_all(handles)
            .await
            .into_iter()
            .zip(&spans)
            .map(|(joined, &span)| {
                joined.unwrap_or_else(|e| ChunkOutcome::failed(span, ChunkError::Aborted(e.to_string())))
            })
            .collect();

        for outcome in &chunks {
            match outcome.error() {
                None => debug!(
                    chunk = outcome.span.ordinal + 1,
                    indices = outcome.indices().len(),
                    "chunk succeeded"
                ),
                Some(e) => warn!(chunk = outcome.span.ordinal + 1, error = %e, "chunk failed"),
            }
        }

        let indices = aggregate(chunks.iter().map(|c| c.indices().iter().copied()));
        let rows = project(&indices, &dataset.rows);

        let report = QueryReport {
            total_rows,
            short_circuit: None,
            chunks,
            indices,
            completed_at: Utc::now(),
        };
        info!(
            unique_indices = report.indices.len(),
            succeeded = report.succeeded(),
            failed = report.chunks.len() - report.succeeded(),
            "aggregated chunk results"
        );

        QueryResult { rows, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassifierError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Never;

    #[async_trait]
    impl Classifier for Never {
        async fn classify(&self, _: &str, _: &str) -> Result<String, ClassifierError> {
            panic!("classifier must not be called");
        }
    }

    struct Counting(AtomicUsize);

    #[async_trait]
    impl Classifier for Counting {
        async fn classify(&self, _: &str, _: &str) -> Result<String, ClassifierError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("[]".to_string())
        }
    }

    struct Echo(&'static str);

    #[async_trait]
    impl Classifier for Echo {
        async fn classify(&self, _: &str, _: &str) -> Result<String, ClassifierError> {
            Ok(self.0.to_string())
        }
    }

    fn dataset(n: usize) -> Arc<Dataset> {
        Arc::new(Dataset::new(
            vec!["Event".into()],
            (1..=n).map(|i| vec![format!("event {i}")]).collect(),
        ))
    }

    #[test]
    fn invalid_config_rejected() {
        let config = QueryConfig::default().with_chunk_size(0);
        assert!(RelevanceEngine::new(Arc::new(Never), config).is_err());
    }

    #[tokio::test]
    async fn whitespace_query_is_dispatched() {
        let classifier = Arc::new(Counting(AtomicUsize::new(0)));
        let config = QueryConfig::default().with_chunk_size(2);
        let engine = RelevanceEngine::new(classifier.clone(), config).unwrap();
        let result = engine.run_query("  ", dataset(5)).await;

        assert_eq!(classifier.0.load(Ordering::SeqCst), 3);
        assert_eq!(result.report.short_circuit, None);
        assert_eq!(result.report.chunks.len(), 3);
        assert!(result.rows.is_empty());
    }

    #[tokio::test]
    async fn empty_query_returns_rows_without_dispatch() {
        let engine = RelevanceEngine::new(Arc::new(Never), QueryConfig::default()).unwrap();
        let ds = dataset(3);
        let result = engine.run_query("", Arc::clone(&ds)).await;
        assert_eq!(result.rows, ds.rows);
        assert_eq!(result.report.short_circuit, Some(ShortCircuit::EmptyQuery));
    }

    #[tokio::test]
    async fn empty_dataset_short_circuits() {
        let engine = RelevanceEngine::new(Arc::new(Never), QueryConfig::default()).unwrap();
        let result = engine.run_query("yoga", dataset(0)).await;
        assert!(result.rows.is_empty());
        assert_eq!(result.report.short_circuit, Some(ShortCircuit::EmptyDataset));
        assert!(!result.report.is_degraded());
    }

    #[tokio::test]
    async fn panicking_chunk_is_captured_as_aborted() {
        let engine = RelevanceEngine::new(Arc::new(Never), QueryConfig::default()).unwrap();
        let result = engine.run_query("yoga", dataset(5)).await;
        assert!(result.rows.is_empty());
        assert!(result.report.is_degraded());
        let (_, err) = result.report.failed().next().unwrap();
        assert!(matches!(err, ChunkError::Aborted(_)));
    }

    #[tokio::test]
    async fn report_counts() {
        let config = QueryConfig::default().with_chunk_size(2);
        let engine = RelevanceEngine::new(Arc::new(Echo("[1, 3, 5]")), config).unwrap();
        let result = engine.run_query("q", dataset(5)).await;

        assert_eq!(result.report.chunks.len(), 3);
        assert_eq!(result.report.succeeded(), 3);
        assert_eq!(result.report.indices, vec![1, 3, 5]);
        assert_eq!(result.rows.len(), 3);
        assert!(result.report.completed_at <= Utc::now());
    }
}
