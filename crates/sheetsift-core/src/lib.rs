//! Core types for sheetsift: datasets, chunk partitioning, result projection, query configuration.

pub mod config;
pub mod dataset;
mod error;
pub mod projection;

pub use config::QueryConfig;
pub use dataset::{Chunk, ChunkSpan, Dataset, Row, partition};
pub use error::ConfigError;
pub use projection::{aggregate, project};
