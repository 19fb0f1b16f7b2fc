pub mod fetcher;
pub mod lifecycle;
pub mod novelty;
pub mod scheduler;

pub use fetcher::{HttpLeaderboardSource, SnapshotSource};
pub use scheduler::{CycleOutcome, PollScheduler};
