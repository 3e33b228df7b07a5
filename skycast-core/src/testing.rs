//! Stub fetchers shared by the race and cache tests.

use async_trait::async_trait;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio_util::sync::CancellationToken;

use crate::{FailureCause, FetchError, Fetcher, ProviderFailure, WeatherReading};

#[derive(Debug)]
enum Behaviour {
    Succeed(WeatherReading),
    Fail(String),
    Hang,
}

#[derive(Debug)]
pub(crate) struct StubFetcher {
    name: String,
    behaviour: Behaviour,
    delay: Duration,
    cities: Mutex<Vec<String>>,
    observed_cancel: CancellationToken,
}

impl StubFetcher {
    fn build(name: &str, behaviour: Behaviour) -> Self {
        Self {
            name: name.to_string(),
            behaviour,
            delay: Duration::ZERO,
            cities: Mutex::new(Vec::new()),
            observed_cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn succeeding(name: &str, reading: WeatherReading) -> Arc<Self> {
        Arc::new(Self::build(name, Behaviour::Succeed(reading)))
    }

    pub(crate) fn failing(name: &str, message: &str) -> Arc<Self> {
        Arc::new(Self::build(name, Behaviour::Fail(message.to_string())))
    }

    /// Never answers; returns a cancelled failure once the token fires.
    pub(crate) fn hanging(name: &str) -> Arc<Self> {
        Arc::new(Self::build(name, Behaviour::Hang))
    }

    pub(crate) fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        let mut stub = Arc::try_unwrap(self).expect("stub not yet shared");
        stub.delay = delay;
        Arc::new(stub)
    }

    pub(crate) fn calls(&self) -> usize {
        self.cities.lock().unwrap().len()
    }

    pub(crate) fn cities(&self) -> Vec<String> {
        self.cities.lock().unwrap().clone()
    }

    pub(crate) async fn wait_cancelled(&self) {
        self.observed_cancel.cancelled().await;
    }

    fn failure(&self, cause: FailureCause) -> FetchError {
        ProviderFailure::new(self.name.clone(), cause).into()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(
        &self,
        cancel: &CancellationToken,
        city: &str,
    ) -> Result<WeatherReading, FetchError> {
        self.cities.lock().unwrap().push(city.to_string());

        if !self.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.observed_cancel.cancel();
                    return Err(self.failure(FailureCause::Cancelled));
                }
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        match &self.behaviour {
            Behaviour::Succeed(reading) => Ok(reading.clone()),
            Behaviour::Fail(message) => Err(self.failure(FailureCause::Other(message.clone()))),
            Behaviour::Hang => {
                cancel.cancelled().await;
                self.observed_cancel.cancel();
                Err(self.failure(FailureCause::Cancelled))
            }
        }
    }
}
