//! # Events
//!
//! The transient envelope delivered to handlers, and topic matching.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::Timestamp;

use crate::topics::WILDCARD;

/// A single emission. Never persisted; exists only during dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Namespaced topic, e.g. `module:loaded`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque payload.
    pub payload: Value,
    /// Emitter identity.
    pub source: String,
    /// Milliseconds since UNIX epoch.
    pub timestamp: Timestamp,
}

impl Event {
    pub fn new(
        event_type: impl Into<String>,
        payload: Value,
        source: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            source: source.into(),
            timestamp,
        }
    }

    /// Deserialize the payload into a typed value.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    /// Topic namespace (text before the first `:`), if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.event_type.split_once(':').map(|(ns, _)| ns)
    }
}

/// What a registration listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicPattern {
    /// `*`: every emission.
    All,
    /// `ns:*`: every topic starting with `ns:`. Holds the prefix with colon.
    Namespace(String),
    /// An exact topic.
    Exact(String),
}

impl TopicPattern {
    #[must_use]
    pub fn parse(topic: &str) -> Self {
        if topic == WILDCARD {
            Self::All
        } else if let Some(prefix) = topic.strip_suffix('*').filter(|p| p.ends_with(':')) {
            Self::Namespace(prefix.to_string())
        } else {
            Self::Exact(topic.to_string())
        }
    }

    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Self::All => true,
            Self::Namespace(prefix) => topic.starts_with(prefix.as_str()),
            Self::Exact(exact) => exact == topic,
        }
    }
}
