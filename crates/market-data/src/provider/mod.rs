//! Producer abstractions and implementations.
//!
//! This module contains:
//! - The `Producer` trait that every data source implements
//! - Closure adapters and ordered producer chains
//! - A token bucket rate limiter shared by producers of one upstream
//! - The Yahoo Finance producers
//!
//! Producers know nothing about caching. They perform a single fetch attempt
//! and report success or failure; the coordinator decides what to do next.

mod chain;
mod rate_limiter;
mod traits;

pub mod yahoo;

pub use chain::ProducerChain;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use traits::{producer_fn, FnProducer, Producer};
