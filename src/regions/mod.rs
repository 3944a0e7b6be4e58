//! Region hierarchy crawl
//!
//! Resolves province → regency → district from the region API and produces
//! the district key list used by a harvest run.

mod client;

pub use client::{Region, RegionClient};

use crate::config::RegionsConfig;
use crate::keys::Key;
use crate::HarvestError;
use std::time::Duration;

/// Collects the normalized district names of the configured province
///
/// # Returns
///
/// * `Ok(Vec<Key>)` - Sorted, unique district names
/// * `Err(HarvestError)` - The province was not found or a request failed
pub async fn collect_district_keys(config: &RegionsConfig) -> Result<Vec<Key>, HarvestError> {
    let client = RegionClient::new(&config.base_url, Duration::from_millis(config.timeout_ms))?;
    client.collect_district_names(&config.province).await
}
