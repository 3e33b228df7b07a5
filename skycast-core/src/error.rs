use reqwest::StatusCode;
use thiserror::Error;

/// Why a single provider could not produce a reading.
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error("API key is not set")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("JSON decode error: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("no weather data in response")]
    MissingData,

    #[error("request cancelled")]
    Cancelled,

    /// Failure reported by a non-HTTP fetcher.
    #[error("{0}")]
    Other(String),
}

/// A failure attributed to one named provider.
#[derive(Debug, Error)]
#[error("{provider}: {cause}")]
pub struct ProviderFailure {
    pub provider: String,
    #[source]
    pub cause: FailureCause,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, cause: FailureCause) -> Self {
        Self { provider: provider.into(), cause }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause, FailureCause::Cancelled)
    }
}

/// Error returned by any [`Fetcher`](crate::Fetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no weather providers configured")]
    NoProviders,

    #[error(transparent)]
    Provider(#[from] ProviderFailure),

    /// Every racing provider failed; causes are kept in arrival order.
    #[error("all providers failed: {}", join_messages(.0))]
    AllFailed(Vec<FetchError>),
}

fn join_messages(errors: &[FetchError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("no answer from cache backend within {0:?}")]
    Timeout(std::time::Duration),
}

/// Startup-time failure to assemble a usable fetcher.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no weather providers available: {}", join_failures(.0))]
    NoProviders(Vec<ProviderFailure>),

    #[error("invalid cache configuration: {0:#}")]
    InvalidCacheConfig(#[source] anyhow::Error),

    #[error("cache backend unreachable: {0}")]
    CacheUnreachable(#[source] CacheError),
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
