use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_LEADERBOARD_URL: &str = "https://sapi.demb.uk/api/leaderboard/cqc/platform/pc";
const DEFAULT_DIFF_URL: &str = "https://sapi.demb.uk/api/diff/{action_id}";
const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Discord bot token used for message delivery
    pub discord_bot_token: String,

    /// Discord REST API base URL
    pub discord_api_base: String,

    /// Upstream leaderboard URL
    pub leaderboard_url: String,

    /// Upstream diff URL; `{action_id}` is substituted per request
    pub diff_url: String,

    /// Poll period in seconds (default: 60)
    pub poll_interval_secs: u64,

    /// Budget for one fetch → detect → dispatch cycle (default: 45)
    pub cycle_timeout_secs: u64,

    /// Timeout for individual HTTP requests (default: 10)
    pub http_timeout_secs: u64,

    /// Delivery attempts per destination and entry (default: 3)
    pub delivery_max_attempts: u32,

    /// Base delay between delivery attempts, doubled each retry (default: 500)
    pub delivery_backoff_ms: u64,

    /// Maximum concurrent deliveries per entry (default: 8)
    pub dispatch_concurrency: usize,

    /// Destination registry JSON file
    pub registry_path: PathBuf,

    /// HTTP admin API listen address
    pub api_bind_addr: SocketAddr,

    /// Bearer token for the admin API. Admin routes reject everything when unset.
    pub admin_api_token: Option<String>,

    /// Squadrons rendered with the highlight marker
    pub highlight_squadrons: Vec<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            discord_bot_token: std::env::var("DISCORD_BOT_TOKEN").map_err(|_| {
                anyhow::anyhow!("DISCORD_BOT_TOKEN environment variable is required")
            })?,
            discord_api_base: std::env::var("DISCORD_API_BASE")
                .unwrap_or_else(|_| DEFAULT_DISCORD_API_BASE.to_string()),
            leaderboard_url: std::env::var("LEADERBOARD_URL")
                .unwrap_or_else(|_| DEFAULT_LEADERBOARD_URL.to_string()),
            diff_url: std::env::var("DIFF_URL").unwrap_or_else(|_| DEFAULT_DIFF_URL.to_string()),
            poll_interval_secs: parse_env("POLL_INTERVAL_SECS", "60")?,
            cycle_timeout_secs: parse_env("CYCLE_TIMEOUT_SECS", "45")?,
            http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS", "10")?,
            delivery_max_attempts: parse_env("DELIVERY_MAX_ATTEMPTS", "3")?,
            delivery_backoff_ms: parse_env("DELIVERY_BACKOFF_MS", "500")?,
            dispatch_concurrency: parse_env("DISPATCH_CONCURRENCY", "8")?,
            registry_path: std::env::var("REGISTRY_PATH")
                .unwrap_or_else(|_| "servers.json".to_string())
                .into(),
            api_bind_addr: parse_env("API_BIND_ADDR", "0.0.0.0:3000")?,
            admin_api_token: std::env::var("ADMIN_API_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            highlight_squadrons: split_list(
                &std::env::var("HIGHLIGHT_SQUADRONS")
                    .unwrap_or_else(|_| "WE ROCK YOU ROLL".to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the poll loop cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("POLL_INTERVAL_SECS must be at least 1");
        }
        if self.cycle_timeout_secs == 0 {
            anyhow::bail!("CYCLE_TIMEOUT_SECS must be at least 1");
        }
        if self.cycle_timeout_secs > self.poll_interval_secs {
            anyhow::bail!("CYCLE_TIMEOUT_SECS must not exceed POLL_INTERVAL_SECS");
        }
        if self.delivery_max_attempts == 0 {
            anyhow::bail!("DELIVERY_MAX_ATTEMPTS must be at least 1");
        }
        if self.dispatch_concurrency == 0 {
            anyhow::bail!("DISPATCH_CONCURRENCY must be at least 1");
        }
        if !self.diff_url.contains("{action_id}") {
            anyhow::bail!("DIFF_URL must contain an {{action_id}} placeholder");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn delivery_backoff(&self) -> Duration {
        Duration::from_millis(self.delivery_backoff_ms)
    }
}

fn parse_env<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| anyhow::anyhow!("{} has an invalid value", key))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
