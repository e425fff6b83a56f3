//! Countdown timers that run independently of the interaction loop.
//!
//! Each `start` spawns its own tokio task; the completion callback fires on
//! that task, concurrent with whatever the foreground is doing.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

/// Duration substituted when a requested countdown is missing or not positive.
pub const DEFAULT_SECONDS: u64 = 60;

/// Invoked exactly once per timer, with the label and the effective duration.
pub type TimerCallback = Arc<dyn Fn(&str, u64) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerInfo {
    pub id: Uuid,
    pub label: String,
    pub duration_seconds: u64,
    pub started_at: DateTime<Utc>,
}

struct TimerEntry {
    info: TimerInfo,
    handle: JoinHandle<()>,
}

/// Manages concurrently running countdowns. Cloning shares the same set.
#[derive(Clone, Default)]
pub struct TimerService {
    timers: Arc<RwLock<HashMap<Uuid, TimerEntry>>>,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a countdown and return as soon as it is registered.
    ///
    /// Non-positive `seconds` substitutes [`DEFAULT_SECONDS`]. The callback
    /// runs once when the countdown elapses; a cancelled timer never fires.
    /// Completion of one timer never affects another.
    pub async fn start(&self, seconds: i64, label: &str, on_finish: TimerCallback) -> Uuid {
        let duration_seconds = if seconds > 0 {
            seconds as u64
        } else {
            DEFAULT_SECONDS
        };
        let id = Uuid::new_v4();
        let info = TimerInfo {
            id,
            label: label.to_owned(),
            duration_seconds,
            started_at: Utc::now(),
        };

        let timers = Arc::clone(&self.timers);
        let label = label.to_owned();
        let handle = tokio::spawn(async move {
            sleep(Duration::from_secs(duration_seconds)).await;
            // Racing `cancel` for the write lock: whichever side removes the
            // entry wins, so the callback runs at most once and a cancelled
            // timer is aborted before it reaches it.
            timers.write().await.remove(&id);
            tracing::debug!(timer_id = %id, label = %label, "timer elapsed");
            on_finish(&label, duration_seconds);
        });

        self.timers
            .write()
            .await
            .insert(id, TimerEntry { info, handle });
        id
    }

    /// Abort a running timer. Returns false when it already fired or is gone.
    pub async fn cancel(&self, id: Uuid) -> bool {
        let mut timers = self.timers.write().await;
        match timers.remove(&id) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Snapshot of timers that have not yet elapsed.
    pub async fn active(&self) -> Vec<TimerInfo> {
        self.timers
            .read()
            .await
            .values()
            .map(|entry| entry.info.clone())
            .collect()
    }
}
