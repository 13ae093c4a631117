//! sparkfetch -- resilient retrieval of Spark history server telemetry.
//!
//! This crate resolves the history server endpoint, fetches an application's
//! summary, picks its latest attempt, and pulls jobs, stages and executors
//! for that attempt concurrently into a single [`model::AggregateResult`].

pub mod client;
pub mod config;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod model;
pub mod transport;

pub use client::HistoryClient;
pub use config::FetcherConfig;
pub use error::{Disposition, FetchError};
pub use model::AggregateResult;
