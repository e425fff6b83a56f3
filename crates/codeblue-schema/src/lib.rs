use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One logged occurrence during a resuscitation episode.
///
/// Rows are immutable after insert; `id` is assigned by the store and is
/// strictly increasing in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalEvent {
    pub id: i64,
    pub name: String,
    pub note: String,
    /// Wall clock in the episode's local time zone, minute resolution.
    pub timestamp: String,
    #[serde(default)]
    pub extra: Option<Map<String, Value>>,
}

/// Normalized outcome of interpreting one user utterance.
///
/// The interpreter collaborator answers with a single JSON record tagged by
/// `action`; every field has a default so a sparse record still parses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Intent {
    LogEvent {
        #[serde(default = "default_event_name")]
        event: String,
        #[serde(default)]
        note: String,
        #[serde(default)]
        extra: Option<Map<String, Value>>,
    },
    StartTimer {
        #[serde(default = "default_timer_seconds")]
        seconds: i64,
        #[serde(default = "default_timer_label")]
        label: String,
    },
    Reply {
        #[serde(default)]
        message: String,
    },
    /// Well-formed record whose `action` value is not one of the above.
    #[serde(other)]
    Unknown,
}

fn default_event_name() -> String {
    "事件".to_string()
}

fn default_timer_seconds() -> i64 {
    60
}

fn default_timer_label() -> String {
    "計時器".to_string()
}

pub const DEFAULT_TIMER_SECONDS: i64 = 60;

impl Intent {
    pub fn reply(message: impl Into<String>) -> Self {
        Intent::Reply {
            message: message.into(),
        }
    }

    /// Parse raw collaborator output into an intent.
    ///
    /// Anything that is not a single parseable JSON record degrades to
    /// `Reply` carrying the text verbatim. Never errors.
    pub fn normalize(raw: &str) -> Intent {
        match serde_json::from_str::<Intent>(raw.trim()) {
            Ok(intent) => intent,
            Err(_) => Intent::reply(raw),
        }
    }
}
