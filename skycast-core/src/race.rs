//! Race-to-first fetching across several providers.
//!
//! Every provider is queried on its own task. The first success wins and the
//! shared per-call token is cancelled so the others can abandon their HTTP
//! calls. Losers are not awaited: whatever they produce afterwards lands in
//! the buffered channel and is dropped with it.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{FetchError, Fetcher, WeatherReading};

#[derive(Debug, Clone)]
pub struct RaceFetcher {
    providers: Vec<Arc<dyn Fetcher>>,
}

impl RaceFetcher {
    pub fn new(providers: Vec<Arc<dyn Fetcher>>) -> Self {
        Self { providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl Fetcher for RaceFetcher {
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        city: &str,
    ) -> Result<WeatherReading, FetchError> {
        match self.providers.as_slice() {
            [] => {
                tracing::error!("no weather providers configured");
                Err(FetchError::NoProviders)
            }
            [only] => only.fetch(cancel, city).await,
            providers => race(providers, cancel, city).await,
        }
    }
}

async fn race(
    providers: &[Arc<dyn Fetcher>],
    cancel: &CancellationToken,
    city: &str,
) -> Result<WeatherReading, FetchError> {
    let call = cancel.child_token();
    // Cancels the losers on every exit path, including the caller dropping us.
    let _guard = call.clone().drop_guard();

    let (tx, mut rx) = mpsc::channel(providers.len());

    for provider in providers {
        let provider = Arc::clone(provider);
        let token = call.clone();
        let city = city.to_owned();
        let tx = tx.clone();

        tokio::spawn(async move {
            let result = provider.fetch(&token, &city).await;
            match &result {
                Ok(reading) => tracing::debug!(
                    temperature = reading.temperature,
                    humidity = reading.humidity,
                    description = %reading.description,
                    "weather fetcher succeeded"
                ),
                Err(err) => tracing::debug!(error = %err, "weather fetcher failed or cancelled"),
            }
            // Receiver may be gone once a winner was picked.
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    let mut errors = Vec::with_capacity(providers.len());
    while let Some(result) = rx.recv().await {
        match result {
            Ok(reading) => {
                call.cancel();
                tracing::info!(
                    city,
                    temperature = reading.temperature,
                    humidity = reading.humidity,
                    description = %reading.description,
                    "using weather result"
                );
                return Ok(reading);
            }
            Err(err) => errors.push(err),
        }
    }

    let err = FetchError::AllFailed(errors);
    tracing::error!(city, error = %err, "weather fetch failed");
    Err(err)
}
