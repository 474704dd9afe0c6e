//! Parse-then-validate pipeline for the classifier's untrusted text output.
//!
//! [`parse_response`] is a pure function of the raw text and the span of the
//! chunk it answers; it never looks at the dataset or the request.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use sheetsift_core::ChunkSpan;
use thiserror::Error;

static INTEGER_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("integer pattern is valid"));

#[derive(Error, Debug)]
pub enum ResponseError {
    /// Text delimited by `[` and `]` that is not a valid JSON array.
    #[error("response is not a valid JSON array: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a candidate index was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A whole number outside the chunk's original index range.
    OutOfRange(String),
    /// A number with a fractional part.
    NotAnInteger(String),
    /// Not a number at all (string, object, null, ...).
    NotANumber(String),
}

/// Validated result of one classifier response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedIndices {
    /// Original 1-based indices inside the chunk's span, in the order received.
    pub indices: Vec<usize>,
    /// Candidates that were dropped, with the reason.
    pub rejected: Vec<Rejection>,
    /// The response was not a JSON array; indices were scanned out of free text.
    pub salvaged: bool,
}

enum Candidate<'a> {
    Json(Value),
    Digits(&'a str),
}

impl Candidate<'_> {
    fn validate(self, span: &ChunkSpan) -> Result<usize, Rejection> {
        match self {
            Candidate::Digits(digits) => match digits.parse::<usize>() {
                Ok(index) if span.contains_index(index) => Ok(index),
                _ => Err(Rejection::OutOfRange(digits.to_string())),
            },
            Candidate::Json(Value::Number(n)) => {
                if let Some(index) = n.as_u64().and_then(|u| usize::try_from(u).ok()) {
                    return if span.contains_index(index) {
                        Ok(index)
                    } else {
                        Err(Rejection::OutOfRange(n.to_string()))
                    };
                }
                if n.is_i64() {
                    return Err(Rejection::OutOfRange(n.to_string()));
                }
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 => {
                        let index = f as usize;
                        if f >= 0.0 && f <= usize::MAX as f64 && span.contains_index(index) {
                            Ok(index)
                        } else {
                            Err(Rejection::OutOfRange(n.to_string()))
                        }
                    }
                    _ => Err(Rejection::NotAnInteger(n.to_string())),
                }
            }
            Candidate::Json(other) => Err(Rejection::NotANumber(other.to_string())),
        }
    }
}

/// Parse `raw` and keep only indices that belong to `span`.
///
/// 1. Strip Markdown code fences and surrounding whitespace.
/// 2. Text bracketed by `[` … `]` must parse as a JSON array.
/// 3. Anything else is scanned for integer runs; none found means no indices.
/// 4. Every candidate must be a whole number within
///    `[span.first_index(), span.last_index()]`.
pub fn parse_response(raw: &str, span: &ChunkSpan) -> Result<ParsedIndices, ResponseError> {
    let cleaned = strip_fences(raw);

    let bracketed = cleaned.starts_with('[') && cleaned.ends_with(']');
    let (candidates, salvaged): (Vec<Candidate<'_>>, bool) = if bracketed {
        let items: Vec<Value> = serde_json::from_str(cleaned)?;
        (items.into_iter().map(Candidate::Json).collect(), false)
    } else {
        let digits = INTEGER_RUN
            .find_iter(cleaned)
            .map(|m| Candidate::Digits(m.as_str()))
            .collect();
        (digits, true)
    };

    let mut parsed = ParsedIndices {
        salvaged,
        ..Default::default()
    };
    for candidate in candidates {
        match candidate.validate(span) {
            Ok(index) => parsed.indices.push(index),
            Err(rejection) => parsed.rejected.push(rejection),
        }
    }
    Ok(parsed)
}

/// Remove a leading fence (with optional language tag) and a trailing fence.
fn strip_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.chars().next() {
            Some(c) if c.is_ascii_alphabetic() => {
                let tag_end = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
                    .unwrap_or(rest.len());
                &rest[tag_end..]
            }
            _ => rest,
        };
    }
    s = s.trim();
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}
