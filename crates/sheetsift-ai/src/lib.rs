//! Relevance classification layer: chunked dispatch to an external LLM classifier,
//! untrusted-response validation, and scatter-gather merging of per-chunk results.

mod classifier;
pub mod engine;
pub mod openai;
pub mod processor;
pub mod prompt;
pub mod response;

pub use classifier::{Classifier, ClassifierError};
pub use engine::{QueryReport, QueryResult, RelevanceEngine, ShortCircuit};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use processor::{ChunkError, ChunkOutcome, ChunkState, ChunkStatus};
pub use response::{ParsedIndices, Rejection, ResponseError, parse_response};
