//! HTTP client for the region API
//!
//! Endpoints, relative to the base URL:
//! - `provinces.json`
//! - `regencies/<province code>.json`
//! - `districts/<regency code>.json`
//!
//! Every endpoint answers `{"data": [{"code": "...", "name": "..."}, ...]}`.

use crate::keys::{normalize_keys, Key};
use crate::HarvestError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// One entry of the region hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct RegionList {
    data: Vec<Region>,
}

/// Client for the region API
pub struct RegionClient {
    client: Client,
    base_url: Url,
}

impl RegionClient {
    /// Creates a region client
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `https://wilayah.id/api`
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HarvestError> {
        // Url::join replaces the last segment unless the base ends with '/'
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');

        let client = Client::builder()
            .user_agent(concat!("weather-harvest/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
        })
    }

    /// Lists all provinces
    pub async fn provinces(&self) -> Result<Vec<Region>, HarvestError> {
        self.get_list("provinces.json").await
    }

    /// Lists the regencies of a province
    pub async fn regencies(&self, province_code: &str) -> Result<Vec<Region>, HarvestError> {
        self.get_list(&format!("regencies/{}.json", province_code))
            .await
    }

    /// Lists the districts of a regency
    pub async fn districts(&self, regency_code: &str) -> Result<Vec<Region>, HarvestError> {
        self.get_list(&format!("districts/{}.json", regency_code))
            .await
    }

    /// Finds a province by name, ignoring case and surrounding whitespace
    pub async fn find_province(&self, name: &str) -> Result<Region, HarvestError> {
        let wanted = name.trim().to_uppercase();
        self.provinces()
            .await?
            .into_iter()
            .find(|p| p.name.trim().to_uppercase() == wanted)
            .ok_or_else(|| HarvestError::ProvinceNotFound(name.to_string()))
    }

    /// Collects the district names of a province, sorted and deduplicated
    ///
    /// Regencies are walked one at a time; the first failed request aborts
    /// the whole crawl.
    pub async fn collect_district_names(&self, province_name: &str) -> Result<Vec<Key>, HarvestError> {
        let province = self.find_province(province_name).await?;
        tracing::info!("Found province {} ({})", province.name, province.code);

        let regencies = self.regencies(&province.code).await?;
        tracing::info!("Province {} has {} regencies", province.name, regencies.len());

        let mut names = Vec::new();
        for regency in &regencies {
            let districts = self.districts(&regency.code).await?;
            tracing::debug!("{}: {} districts", regency.name, districts.len());
            names.extend(districts.into_iter().map(|d| d.name));
        }

        let keys = normalize_keys(&names);
        tracing::info!(
            "Collected {} districts ({} unique) in {}",
            names.len(),
            keys.len(),
            province.name
        );

        Ok(keys)
    }

    async fn get_list(&self, path: &str) -> Result<Vec<Region>, HarvestError> {
        let url = self.base_url.join(path)?;
        let list: RegionList = self.get_json(&url).await?;
        Ok(list.data)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, HarvestError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok(serde_json::from_slice(&body)?)
    }
}
