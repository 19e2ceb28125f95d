//! Error types for the market data cache.
//!
//! This module provides:
//! - [`FetchError`]: The error enum returned by producers and by the coordinator
//! - [`FetchAttempt`]: One entry of the per-resolve attempt log

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while fetching market data.
///
/// Producer-level variants (`ProducerFailure`, `EmptyResult`, `Timeout`) are
/// handled inside the coordinator by moving to the next producer in the chain.
/// Only `AllProducersExhausted` is ever surfaced by
/// [`FetchCoordinator::resolve`](crate::cache::FetchCoordinator::resolve).
///
/// The type is `Clone` so a single outcome can be handed to every caller
/// waiting on the same in-flight fetch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The external fetch raised or returned an error
    /// (network, malformed response, unknown symbol).
    #[error("Producer failure: {producer} - {message}")]
    ProducerFailure {
        /// The producer that failed
        producer: String,
        /// The error message from the producer
        message: String,
    },

    /// The fetch nominally succeeded but returned no usable rows or fields.
    #[error("Empty result: {producer}")]
    EmptyResult {
        /// The producer that returned nothing usable
        producer: String,
    },

    /// The producer exceeded its time budget.
    #[error("Timeout: {producer} after {budget:?}")]
    Timeout {
        /// The producer that timed out
        producer: String,
        /// The budget that was exceeded
        budget: Duration,
    },

    /// Every producer in the primary + fallback chain failed.
    /// Terminal for the resolve call that produced it.
    #[error("All producers exhausted for {key}: {}", summarize(.attempts))]
    AllProducersExhausted {
        /// Display form of the cache key
        key: String,
        /// One record per producer tried, in chain order
        attempts: Vec<FetchAttempt>,
    },
}

impl FetchError {
    /// Shorthand for a [`FetchError::ProducerFailure`].
    pub fn producer(producer: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ProducerFailure {
            producer: producer.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for a [`FetchError::EmptyResult`].
    pub fn empty(producer: impl Into<String>) -> Self {
        Self::EmptyResult {
            producer: producer.into(),
        }
    }

    /// Returns true for any failure of a single producer attempt.
    ///
    /// A timeout counts as a producer failure, and so does an empty result:
    /// all three make the coordinator move on to the next fallback.
    pub fn is_producer_failure(&self) -> bool {
        matches!(
            self,
            Self::ProducerFailure { .. } | Self::EmptyResult { .. } | Self::Timeout { .. }
        )
    }

    /// Returns true if the error ended a whole resolve call.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::AllProducersExhausted { .. })
    }

    /// Name of the producer this error came from, if it is a producer-level error.
    pub fn producer_name(&self) -> Option<&str> {
        match self {
            Self::ProducerFailure { producer, .. }
            | Self::EmptyResult { producer }
            | Self::Timeout { producer, .. } => Some(producer.as_str()),
            Self::AllProducersExhausted { .. } => None,
        }
    }
}

/// Record of a single producer attempt during a resolve call.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchAttempt {
    pub producer: String,
    pub error: FetchError,
}

impl fmt::Display for FetchAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.producer, self.error)
    }
}

fn summarize(attempts: &[FetchAttempt]) -> String {
    if attempts.is_empty() {
        return "no producers".to_string();
    }
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
