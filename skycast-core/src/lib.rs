//! Core library for `skycast`.
//!
//! This crate defines:
//! - The [`Fetcher`] capability shared by every weather source
//! - Two provider clients (OpenWeatherMap, WeatherAPI.com)
//! - A race-to-first fetcher over those providers
//! - A redis-backed cache decorator
//! - Configuration & credentials handling
//!
//! [`build_fetcher`] wires all of it into the single fetcher that API
//! handlers and notification jobs share.

pub mod cache;
pub mod compose;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod provider;
pub mod race;

#[cfg(test)]
mod testing;

pub use cache::{CACHE_TTL, CONNECT_TIMEOUT, CacheStore, CachingFetcher, RedisStore, cache_key};
pub use compose::{build_fetcher, build_race};
pub use config::{CacheConfig, Config, ProviderConfig};
pub use error::{BuildError, CacheError, FailureCause, FetchError, ProviderFailure};
pub use fetch::Fetcher;
pub use model::WeatherReading;
pub use provider::{ProviderId, provider_from_config, providers_from_config};
pub use race::RaceFetcher;
