use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::Password;
use skycast_core::{Config, Fetcher, ProviderId, WeatherReading, build_fetcher};
use tokio_util::sync::CancellationToken;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Weather lookups raced across providers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweather" or "weatherapi".
        provider: String,
    },

    /// Point the weather cache at a redis server.
    Cache {
        /// `host:port` of the redis server.
        addr: String,

        /// Prompt for the redis password.
        #[arg(long)]
        password: bool,
    },

    /// List providers and whether they have credentials.
    Providers,

    /// Show current weather for a city.
    Show {
        /// City name, passed to providers as-is.
        city: String,

        /// Print the reading as JSON.
        #[arg(long)]
        json: bool,

        /// Give up after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure_provider(&provider),
            Command::Cache { addr, password } => configure_cache(addr, password),
            Command::Providers => list_providers(),
            Command::Show { city, json, timeout_secs } => {
                show(&city, json, timeout_secs.map(Duration::from_secs)).await
            }
        }
    }
}

fn configure_provider(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut cfg = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        anyhow::bail!("API key for '{id}' must not be empty");
    }

    cfg.upsert_provider_api_key(id, api_key.trim().to_string());
    cfg.save()?;

    println!("Saved API key for {id} to {}", Config::config_file_path()?.display());
    Ok(())
}

fn configure_cache(addr: String, ask_password: bool) -> anyhow::Result<()> {
    let mut cfg = Config::load()?;
    cfg.cache.redis_addr = addr;

    if ask_password {
        let password = Password::new("Redis password:")
            .without_confirmation()
            .prompt()
            .context("Failed to read redis password")?;
        cfg.cache.redis_password = Some(password).filter(|p| !p.is_empty());
    }

    // Fail early on an address the redis client could never use.
    cfg.cache.redis_url()?;
    cfg.save()?;

    println!("Weather cache set to {}", cfg.cache.redis_addr);
    Ok(())
}

fn list_providers() -> anyhow::Result<()> {
    let cfg = Config::load_with_env()?;

    for &id in ProviderId::all() {
        let state = if cfg.is_provider_configured(id) { "configured" } else { "missing key" };
        println!("{id:<12} {state}");
    }

    Ok(())
}

async fn show(city: &str, json: bool, timeout: Option<Duration>) -> anyhow::Result<()> {
    if city.trim().is_empty() {
        anyhow::bail!("City must not be empty");
    }

    let cancel = deadline_token(timeout);

    let cfg = Config::load_with_env()?;
    tracing::debug!(city, "composing weather fetcher");
    let fetcher = tokio::select! {
        _ = cancel.cancelled() => anyhow::bail!("Timed out while initializing weather fetcher"),
        built = build_fetcher(&cfg) => built.context("Failed to initialize weather fetcher")?,
    };

    tracing::debug!(city, "fetching weather");
    let reading = fetcher
        .fetch(&cancel, city)
        .await
        .map_err(|e| anyhow::anyhow!("weather unavailable for {city}: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reading)?);
    } else {
        print!("{}", render(city, &reading));
    }

    Ok(())
}

/// Token cancelled once `timeout` elapses; never cancelled without one.
fn deadline_token(timeout: Option<Duration>) -> CancellationToken {
    let cancel = CancellationToken::new();
    if let Some(timeout) = timeout {
        let deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            deadline.cancel();
        });
    }
    cancel
}

fn render(city: &str, reading: &WeatherReading) -> String {
    format!(
        "Current weather in {city}:\n  Temperature: {:.2}°C\n  Humidity:    {}%\n  Description: {}\n",
        reading.temperature, reading.humidity, reading.description,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_show_with_flags() {
        let cli = Cli::try_parse_from(["skycast", "show", "New York", "--json", "--timeout-secs", "3"])
            .unwrap();

        match cli.command {
            Command::Show { city, json, timeout_secs } => {
                assert_eq!(city, "New York");
                assert!(json);
                assert_eq!(timeout_secs, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn render_formats_reading() {
        let out = render("London", &WeatherReading::new(18.5, 59, "Partly cloudy"));

        assert!(out.contains("Current weather in London"));
        assert!(out.contains("Temperature: 18.50°C"));
        assert!(out.contains("Humidity:    59%"));
        assert!(out.contains("Description: Partly cloudy"));
    }

    #[tokio::test]
    async fn deadline_token_fires_after_timeout() {
        let cancel = deadline_token(Some(Duration::from_millis(20)));
        assert!(!cancel.is_cancelled());

        tokio::time::timeout(Duration::from_secs(2), cancel.cancelled())
            .await
            .expect("deadline should cancel the token");
    }

    #[tokio::test]
    async fn no_timeout_means_no_deadline() {
        let cancel = deadline_token(None);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!cancel.is_cancelled());
    }
}
