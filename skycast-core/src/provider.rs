use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::{convert::TryFrom, sync::Arc};

use crate::{
    Config, FailureCause, Fetcher, ProviderFailure,
    provider::{openweather::OpenWeatherProvider, weatherapi::WeatherApiProvider},
};

pub mod openweather;
pub mod weatherapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    WeatherApi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::WeatherApi]
    }

    /// Environment variable that overrides this provider's key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "OPENWEATHERMAP_ORG_API_KEY",
            ProviderId::WeatherApi => "WEATHERAPI_COM_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, weatherapi."
            )),
        }
    }
}

/// Construct one provider client from config.
///
/// Fails with [`FailureCause::MissingApiKey`] when no usable key is configured.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> Result<Arc<dyn Fetcher>, ProviderFailure> {
    let api_key = config.provider_api_key(id).unwrap_or_default();

    let provider: Arc<dyn Fetcher> = match id {
        ProviderId::OpenWeather => Arc::new(OpenWeatherProvider::new(api_key)?),
        ProviderId::WeatherApi => Arc::new(WeatherApiProvider::new(api_key)?),
    };

    Ok(provider)
}

/// Try every known provider; returns the ones that could be built and the
/// failures of the rest.
pub fn providers_from_config(
    config: &Config,
) -> (Vec<Arc<dyn Fetcher>>, Vec<ProviderFailure>) {
    let mut active = Vec::new();
    let mut failures = Vec::new();

    for &id in ProviderId::all() {
        match provider_from_config(id, config) {
            Ok(provider) => active.push(provider),
            Err(failure) => {
                tracing::warn!(provider = %id, error = %failure, "weather provider not configured");
                failures.push(failure);
            }
        }
    }

    (active, failures)
}

pub(crate) fn require_api_key(
    id: ProviderId,
    api_key: String,
) -> Result<String, ProviderFailure> {
    if api_key.trim().is_empty() {
        return Err(ProviderFailure::new(id.as_str(), FailureCause::MissingApiKey));
    }
    Ok(api_key)
}

pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url, FailureCause> {
    let joined = format!("{}{}", base.trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| FailureCause::Other(format!("invalid endpoint {joined}: {e}")))
}

/// Single GET with query parameters, decoding a JSON body on 2xx.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: Url,
    query: &[(&str, &str)],
) -> Result<T, FailureCause> {
    let res = http.get(url).query(query).send().await.map_err(FailureCause::Transport)?;

    let status = res.status();
    let body = res.text().await;

    if !status.is_success() {
        return Err(status_failure(status, body.as_deref().ok()));
    }

    let body = body.map_err(FailureCause::Transport)?;
    serde_json::from_str(&body).map_err(FailureCause::Payload)
}

/// Non-2xx outcome; an unreadable body still keeps the status.
fn status_failure(status: StatusCode, body: Option<&str>) -> FailureCause {
    FailureCause::Status { status, body: body.map(truncate_body).unwrap_or_default() }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
