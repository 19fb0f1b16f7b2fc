//! Upstream leaderboard fetching.
//!
//! The leaderboard endpoint returns squadron records tagged with the id of the
//! latest leaderboard update ("action"). The entries reported for a cycle are
//! that action's per-squadron experience changes, read from the diff endpoint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use cqc_common::error::FetchError;
use cqc_common::types::{LeaderboardEntry, Snapshot};

/// Upstream timestamp format, always UTC.
const UPSTREAM_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of leaderboard snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Snapshot, FetchError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct LeaderboardRecord {
    action_id: u64,
}

/// One squadron's change within an action, as served by the diff endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DiffRecord {
    pub squadron_name: Option<String>,
    pub tag: Option<String>,
    #[serde(default)]
    pub total_experience_diff: i64,
    pub timestamp: Option<String>,
}

/// HTTP client for the leaderboard and diff endpoints.
pub struct HttpLeaderboardSource {
    client: reqwest::Client,
    leaderboard_url: String,
    diff_url: String,
}

impl HttpLeaderboardSource {
    pub fn new(
        leaderboard_url: String,
        diff_url: String,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cqc-monitor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            leaderboard_url,
            diff_url,
        })
    }

    fn diff_url_for(&self, action_id: u64) -> String {
        self.diff_url.replace("{action_id}", &action_id.to_string())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Transient(format!("request to {} timed out", url))
            } else {
                FetchError::Transient(format!("request to {} failed: {}", url, e.without_url()))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transient(format!(
                "{} returned status {}",
                url, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transient(format!("reading body from {}: {}", url, e)))?;

        serde_json::from_slice(&body)
            .map_err(|e| FetchError::Malformed(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl SnapshotSource for HttpLeaderboardSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let board: Vec<LeaderboardRecord> = self.get_json(&self.leaderboard_url).await?;
        let action_id = board
            .first()
            .map(|r| r.action_id)
            .ok_or_else(|| FetchError::Malformed("leaderboard is empty".to_string()))?;

        let diff: Vec<DiffRecord> = self.get_json(&self.diff_url_for(action_id)).await?;

        tracing::debug!(
            action_id,
            squadrons = board.len(),
            changes = diff.len(),
            "Fetched leaderboard"
        );
        Ok(normalize(action_id, diff, Utc::now()))
    }

    fn name(&self) -> &str {
        "sapi-leaderboard"
    }
}

/// Convert one action's diff records into a snapshot, in upstream order.
///
/// Rows repeating an earlier squadron name, including rows with no name at
/// all (reported as "Unknown"), collapse into the first one and are logged.
pub fn normalize(action_id: u64, records: Vec<DiffRecord>, fetched_at: DateTime<Utc>) -> Snapshot {
    let rows = records.len();
    let entries: Vec<LeaderboardEntry> = records
        .into_iter()
        .map(|r| {
            let squadron = r
                .squadron_name
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string());
            let timestamp = r.timestamp.as_deref().and_then(parse_timestamp);
            let entry = LeaderboardEntry::new(action_id, squadron, r.total_experience_diff, timestamp);
            match r.tag {
                Some(tag) if !tag.is_empty() => entry.with_tag(tag),
                _ => entry,
            }
        })
        .collect();

    let snapshot = Snapshot::new(entries, fetched_at);
    let dropped = rows - snapshot.len();
    if dropped > 0 {
        tracing::warn!(
            action_id,
            rows,
            dropped,
            "Dropped diff rows with a repeated or missing squadron name"
        );
    }
    snapshot
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, UPSTREAM_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
