//! Fetch module for resilient, bounded concurrent lookups
//!
//! This module contains the core harvesting logic, including:
//! - The `FetchClient` seam and the `FetchOutcome` tagged result
//! - Retry policy with exponential backoff
//! - The weather API client
//! - The bounded concurrent mapper and its progress observers

mod client;
mod mapper;
mod progress;
mod retry;
mod weather;

pub use client::{FetchClient, FetchOutcome};
pub use mapper::{BoundedMapper, ResultSet, DEFAULT_WIDTH};
pub use progress::{BarProgress, LogProgress, NoProgress, ProgressEvent, ProgressObserver};
pub use retry::{parse_retry_after, RetryPolicy, MAX_RETRY_AFTER, RETRYABLE_STATUSES};
pub use weather::{Observation, WeatherClient};
