use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a chat server (guild) receiving notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(pub u64);

impl std::fmt::Display for DestinationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a text channel inside a chat server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One squadron's activity within a leaderboard action.
///
/// Identity is the `id` field only: two entries with the same id are equal even
/// if their display fields differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Unique key, `"{action_id}:{squadron_name}"`.
    pub id: String,
    pub action_id: u64,
    pub squadron_name: String,
    pub tag: Option<String>,
    /// Experience gained by the squadron in this action.
    pub experience_gain: i64,
    pub timestamp: Option<DateTime<Utc>>,
}

impl LeaderboardEntry {
    pub fn new(
        action_id: u64,
        squadron_name: impl Into<String>,
        experience_gain: i64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        let squadron_name = squadron_name.into();
        Self {
            id: format!("{}:{}", action_id, squadron_name),
            action_id,
            squadron_name,
            tag: None,
            experience_gain,
            timestamp,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

impl PartialEq for LeaderboardEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LeaderboardEntry {}

impl Hash for LeaderboardEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// An ordered, de-duplicated collection of entries fetched at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    entries: Vec<LeaderboardEntry>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot, keeping the first occurrence of any repeated id.
    pub fn new(entries: Vec<LeaderboardEntry>, fetched_at: DateTime<Utc>) -> Self {
        let mut seen = HashSet::with_capacity(entries.len());
        let entries = entries
            .into_iter()
            .filter(|e| seen.insert(e.id.clone()))
            .collect();
        Self {
            entries,
            fetched_at,
        }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest action id present, if any.
    pub fn latest_action_id(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.action_id).max()
    }
}

/// Delivery configuration for one chat server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub destination_id: DestinationId,
    pub channel_id: Option<ChannelId>,
    pub enabled: bool,
    pub valid: bool,
}

impl Destination {
    pub fn new(destination_id: DestinationId) -> Self {
        Self {
            destination_id,
            channel_id: None,
            enabled: false,
            valid: true,
        }
    }

    /// Whether the dispatcher should deliver to this destination.
    pub fn is_deliverable(&self) -> bool {
        self.enabled && self.valid && self.channel_id.is_some()
    }
}

/// Aggregate counts over the destination registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total: usize,
    /// Destinations that are both enabled and valid.
    pub enabled: usize,
    pub invalid: usize,
}

/// Human-readable notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    /// 24-bit RGB embed colour.
    pub color: u32,
    pub footer: Option<String>,
}

/// Phase of the poll loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    #[default]
    Idle,
    Fetching,
    Detecting,
    Dispatching,
    Stopped,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CyclePhase::Idle => write!(f, "idle"),
            CyclePhase::Fetching => write!(f, "fetching"),
            CyclePhase::Detecting => write!(f, "detecting"),
            CyclePhase::Dispatching => write!(f, "dispatching"),
            CyclePhase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Poll loop status, published by the scheduler for the status command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollStatus {
    pub phase: CyclePhase,
    pub poll_interval_secs: u64,
    pub last_action_id: Option<u64>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub cycles_succeeded: u64,
    pub cycles_failed: u64,
    pub notifications_sent: u64,
}
