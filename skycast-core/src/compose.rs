use std::sync::Arc;

use crate::{
    BuildError, CachingFetcher, Config, Fetcher, RaceFetcher, RedisStore,
    provider::providers_from_config,
};

/// Assemble the process-wide fetcher: every configured provider raced
/// against each other, behind the redis cache.
///
/// Fails when no provider has credentials or redis does not answer. Both are
/// startup errors; callers should abort rather than retry.
pub async fn build_fetcher(config: &Config) -> Result<Arc<dyn Fetcher>, BuildError> {
    let race = build_race(config)?;

    let url = config.cache.redis_url().map_err(BuildError::InvalidCacheConfig)?;
    let store = RedisStore::connect(&url).await.map_err(BuildError::CacheUnreachable)?;

    tracing::info!(addr = %config.cache.redis_addr, "connected to weather cache");

    Ok(Arc::new(CachingFetcher::new(Arc::new(race), Arc::new(store))))
}

/// The uncached half of [`build_fetcher`].
pub fn build_race(config: &Config) -> Result<RaceFetcher, BuildError> {
    let (providers, failures) = providers_from_config(config);
    let race = RaceFetcher::new(providers);

    if race.is_empty() {
        return Err(BuildError::NoProviders(failures));
    }

    tracing::info!(providers = race.len(), "weather providers ready");
    Ok(race)
}
