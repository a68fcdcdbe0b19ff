//! Client event data model and batch decoding

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Span names are this prefix followed by the event type
pub const SPAN_NAME_PREFIX: &str = "process_";

const DEFAULT_EVENT_TYPE: &str = "custom";
const DEFAULT_EVENT_NAME: &str = "unknown";

/// One client-reported occurrence
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventRecord {
    /// Semantic category, e.g. `page` or `click`
    #[serde(rename = "eventType", alias = "type", default = "default_event_type")]
    pub event_type: String,
    #[serde(rename = "eventName", alias = "name", default = "default_event_name")]
    pub name: String,
    /// Client clock; informational only, span timing comes from the server
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "deserialize_properties")]
    pub properties: HashMap<String, String>,
}

impl EventRecord {
    pub fn new(event_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            name: name.into(),
            timestamp: None,
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn span_name(&self) -> String {
        format!("{}{}", SPAN_NAME_PREFIX, self.event_type)
    }
}

fn default_event_type() -> String {
    DEFAULT_EVENT_TYPE.to_string()
}

fn default_event_name() -> String {
    DEFAULT_EVENT_NAME.to_string()
}

/// Accept any JSON scalar as a property value. Nulls are dropped and nested
/// values keep their JSON text.
fn deserialize_properties<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s,
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                nested => nested.to_string(),
            };
            Some((key, value))
        })
        .collect())
}

/// Ordered events from one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBatch {
    records: Vec<EventRecord>,
}

impl EventBatch {
    pub fn new(records: Vec<EventRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }
}

impl From<Vec<EventRecord>> for EventBatch {
    fn from(records: Vec<EventRecord>) -> Self {
        Self::new(records)
    }
}

impl IntoIterator for EventBatch {
    type Item = EventRecord;
    type IntoIter = std::vec::IntoIter<EventRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON array or object of events, got {0}")]
    UnexpectedShape(&'static str),
}

/// Decode a request body into a batch.
///
/// The body is either an array of events or a single event object, which is
/// treated as a batch of one.
pub fn decode(body: &[u8]) -> Result<EventBatch, DecodeError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;

    let records = match value {
        serde_json::Value::Array(_) => serde_json::from_value::<Vec<EventRecord>>(value)?,
        serde_json::Value::Object(_) => vec![serde_json::from_value::<EventRecord>(value)?],
        serde_json::Value::Null => return Err(DecodeError::UnexpectedShape("null")),
        serde_json::Value::Bool(_) => return Err(DecodeError::UnexpectedShape("a boolean")),
        serde_json::Value::Number(_) => return Err(DecodeError::UnexpectedShape("a number")),
        serde_json::Value::String(_) => return Err(DecodeError::UnexpectedShape("a string")),
    };

    Ok(EventBatch::new(records))
}
