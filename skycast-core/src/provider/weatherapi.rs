use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{FailureCause, FetchError, Fetcher, ProviderFailure, WeatherReading};

use super::{ProviderId, endpoint, get_json, require_api_key};

const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderFailure> {
        let api_key = require_api_key(ProviderId::WeatherApi, api_key.into())?;
        Ok(Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), http: Client::new() })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_current(&self, city: &str) -> Result<WeatherReading, FailureCause> {
        let url = endpoint(&self.base_url, "/v1/current.json")?;

        let parsed: WaResponse = get_json(
            &self.http,
            url,
            &[("key", self.api_key.as_str()), ("q", city), ("aqi", "no")],
        )
        .await?;

        let current = parsed.current;
        if current.condition.text.trim().is_empty() {
            return Err(FailureCause::MissingData);
        }

        Ok(WeatherReading {
            temperature: current.temp_c,
            humidity: current.humidity,
            description: current.condition.text,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    humidity: u8,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    current: WaCurrent,
}

#[async_trait]
impl Fetcher for WeatherApiProvider {
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        city: &str,
    ) -> Result<WeatherReading, FetchError> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FailureCause::Cancelled),
            res = self.fetch_current(city) => res,
        };

        result.map_err(|cause| ProviderFailure::new(ProviderId::WeatherApi.as_str(), cause).into())
    }
}
