//! Log records and their canonical wire form.
//!
//! This module provides:
//! - [`Level`] - severity of an entry, with pass-through for unknown values
//! - [`LogRecord`] - the partial record a caller hands to the client
//! - [`LogEntry`] - the normalized entry sent to the collector
//! - [`Normalizer`] - turns records into entries

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Top-level field names of the wire form.
///
/// A metadata key with one of these names overrides the field: string
/// values replace the typed field, any other value is sent in its place.
pub const RESERVED_FIELDS: [&str; 6] = [
    "level",
    "message",
    "service",
    "timestamp",
    "traceId",
    "sessionId",
];

/// Severity of a log entry.
///
/// The four collector levels are named variants. Any other string is kept
/// verbatim in [`Level::Custom`] and transmitted unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Level {
    /// Debugging information
    Debug,
    /// General information
    #[default]
    Info,
    /// Warning conditions
    Warn,
    /// Error conditions
    Error,
    /// Caller-supplied level outside the known set
    Custom(String),
}

impl Level {
    /// Returns the wire representation of this level.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Custom(s) => s,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Custom(s) if s.is_empty())
    }
}

impl From<&str> for Level {
    fn from(s: &str) -> Self {
        match s {
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "WARN" => Self::Warn,
            "ERROR" => Self::Error,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for Level {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        match level {
            Level::Custom(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A partial log record as supplied by the caller.
///
/// Every field is optional; [`Normalizer::normalize`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Severity, defaults to `INFO`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    /// The log message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Service name, defaults to the client's configured service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// ISO-8601 timestamp, defaults to now
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Trace correlation id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Session correlation id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Free-form fields, flattened into the entry on the wire
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl LogRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level.
    #[must_use]
    pub fn level(mut self, level: impl Into<Level>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Overrides the service name.
    #[must_use]
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets an explicit ISO-8601 timestamp string.
    #[must_use]
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Sets the timestamp from a UTC instant.
    #[must_use]
    pub fn timestamp_at(self, at: DateTime<Utc>) -> Self {
        self.timestamp(format_timestamp(at))
    }

    /// Sets the trace id.
    #[must_use]
    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets the session id.
    #[must_use]
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Adds one metadata field.
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builds a record from a JSON object in wire form.
    ///
    /// Known fields are lifted into the record; every other key becomes
    /// metadata. Non-string values of known fields are kept as metadata
    /// under their own key.
    #[must_use]
    pub fn from_json_object(object: Map<String, Value>) -> Self {
        let mut record = Self::default();
        for (key, value) in object {
            match (key.as_str(), value) {
                ("level", Value::String(s)) => record.level = Some(Level::from(s)),
                ("message", Value::String(s)) => record.message = Some(s),
                ("service", Value::String(s)) => record.service = Some(s),
                ("timestamp", Value::String(s)) => record.timestamp = Some(s),
                ("traceId", Value::String(s)) => record.trace_id = Some(s),
                ("sessionId", Value::String(s)) => record.session_id = Some(s),
                ("metadata", Value::Object(nested)) => record.metadata.extend(nested),
                (name, value) => {
                    record.metadata.insert(name.to_owned(), value);
                }
            }
        }
        record
    }
}

/// A normalized log entry, ready for transmission.
///
/// `service` and `timestamp` are always populated. Metadata is flattened
/// into the top level of the JSON form and wins over a typed field of the
/// same name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Severity level
    pub level: Level,
    /// The log message, omitted on the wire when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Producing service
    pub service: String,
    /// ISO-8601 timestamp
    pub timestamp: String,
    /// Trace correlation id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Session correlation id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Additional fields, flattened on the wire
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Serialize for LogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let shadowed = |key: &str| self.metadata.contains_key(key);
        let mut map = serializer.serialize_map(None)?;

        if !shadowed("level") {
            map.serialize_entry("level", &self.level)?;
        }
        if let Some(message) = self.message.as_ref().filter(|_| !shadowed("message")) {
            map.serialize_entry("message", message)?;
        }
        if !shadowed("service") {
            map.serialize_entry("service", &self.service)?;
        }
        if !shadowed("timestamp") {
            map.serialize_entry("timestamp", &self.timestamp)?;
        }
        if let Some(trace_id) = self.trace_id.as_ref().filter(|_| !shadowed("traceId")) {
            map.serialize_entry("traceId", trace_id)?;
        }
        if let Some(session_id) = self.session_id.as_ref().filter(|_| !shadowed("sessionId")) {
            map.serialize_entry("sessionId", session_id)?;
        }
        for (key, value) in &self.metadata {
            map.serialize_entry(key, value)?;
        }

        map.end()
    }
}

impl LogEntry {
    /// Serializes the entry to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if a metadata value cannot be serialized.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Formats an instant the way the collector expects: UTC, millisecond
/// precision, `Z` suffix.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Converts partial records into canonical entries.
#[derive(Debug, Clone)]
pub struct Normalizer {
    service: String,
}

impl Normalizer {
    /// Creates a normalizer that defaults entries to `service`.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Default service name applied to records without one.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Normalizes a record, stamping it with the current time if needed.
    #[must_use]
    pub fn normalize(&self, record: LogRecord) -> LogEntry {
        self.normalize_at(record, Utc::now())
    }

    /// Normalizes a record using `now` as the default timestamp.
    #[must_use]
    pub fn normalize_at(&self, record: LogRecord, now: DateTime<Utc>) -> LogEntry {
        let LogRecord {
            mut level,
            mut message,
            mut service,
            mut timestamp,
            mut trace_id,
            mut session_id,
            mut metadata,
        } = record;

        for field in RESERVED_FIELDS {
            let Some(value) = metadata.remove(field) else {
                continue;
            };
            debug!(field, "Metadata overrides entry field");

            let Value::String(text) = value else {
                // Sent verbatim in place of the typed field
                metadata.insert(field.to_string(), value);
                continue;
            };
            match field {
                "level" => level = Some(Level::from(text)),
                "message" => message = Some(text),
                "service" => service = Some(text),
                "timestamp" => timestamp = Some(text),
                "traceId" => trace_id = Some(text),
                _ => session_id = Some(text),
            }
        }

        LogEntry {
            level: level.filter(|l| !l.is_blank()).unwrap_or_default(),
            message,
            service: non_empty(service).unwrap_or_else(|| self.service.clone()),
            timestamp: non_empty(timestamp).unwrap_or_else(|| format_timestamp(now)),
            trace_id: non_empty(trace_id),
            session_id: non_empty(session_id),
            metadata,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
