use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{FailureCause, FetchError, Fetcher, ProviderFailure, WeatherReading};

use super::{ProviderId, endpoint, get_json, require_api_key};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// OpenWeatherMap current-conditions client. Requests metric units so the
/// temperature arrives in Celsius.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderFailure> {
        let api_key = require_api_key(ProviderId::OpenWeather, api_key.into())?;

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_current(&self, city: &str) -> Result<WeatherReading, FailureCause> {
        let url = endpoint(&self.base_url, "/data/2.5/weather")?;

        let parsed: OwCurrentResponse = get_json(
            &self.http,
            url,
            &[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")],
        )
        .await?;

        let description = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or(FailureCause::MissingData)?;

        Ok(WeatherReading {
            temperature: parsed.main.temp,
            humidity: parsed.main.humidity,
            description,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[async_trait]
impl Fetcher for OpenWeatherProvider {
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

        result.map_err(|cause| ProviderFailure::new(ProviderId::OpenWeather.as_str(), cause).into())
    }
}
