use async_trait::async_trait;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use crate::{FetchError, WeatherReading};

/// Anything that can turn a city name into a [`WeatherReading`].
///
/// Provider clients, the race and the cache all implement this, so they can
/// wrap one another. Implementations should stop work promptly once `cancel`
/// fires.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    async fn fetch(&self, cancel: &CancellationToken, city: &str)
    -> Result<WeatherReading, FetchError>;
}
