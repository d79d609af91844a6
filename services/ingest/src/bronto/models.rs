use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use uuid::Uuid;

/// Fault code the activity endpoints return once a query has no further pages.
pub const END_OF_RESULT_SET: u32 = 116;

/// Namespace for the deterministic ids given to activities.
const ACTIVITY_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_3b2a_9d84_4e57_a0c1_5e2f_7b3d_9a10);

/// Fields the activity endpoints return as `xsd:dateTime`.
pub const DATE_FIELDS: &[&str] = &["createdDate", "deliveryStart"];

/// A single field value as decoded from the remote response.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    DateTime(DateTime<FixedOffset>),
    Value(serde_json::Value),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Value(serde_json::Value::String(s.to_owned()))
    }
}

pub type RawRecord = BTreeMap<String, RawValue>;

/// Which activity feed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Inbound,
    Outbound,
}

impl ActivityKind {
    /// SOAP operation that reads this feed.
    pub fn operation(self) -> &'static str {
        match self {
            ActivityKind::Inbound => "readRecentInboundActivities",
            ActivityKind::Outbound => "readRecentOutboundActivities",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDirection {
    First,
    Next,
}

impl ReadDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadDirection::First => "FIRST",
            ReadDirection::Next => "NEXT",
        }
    }
}

impl fmt::Display for ReadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search filter for one window `[start, end)` of a recent-activity feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub size: u32,
    pub read_direction: ReadDirection,
}

impl ActivityQuery {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, size: u32) -> Self {
        Self {
            start,
            end,
            size,
            read_direction: ReadDirection::First,
        }
    }

    pub fn start_param(&self) -> String {
        self.start.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    pub fn end_param(&self) -> String {
        self.end.to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}

/// Closed classification of everything the transport can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The query has no more pages.
    Exhausted,
    /// Worth retrying: timeouts, throttling, server-side hiccups.
    Transient,
    Fatal,
}

/// Turn the text fields of one `<return>` element into a raw record.
///
/// Date fields become `RawValue::DateTime` when they parse; repeated elements
/// become arrays. Records without an `id` get one derived from their content,
/// so re-reading the same activity yields the same id.
pub fn build_record(fields: BTreeMap<String, Vec<String>>) -> RawRecord {
    let id = manufacture_id(&fields);
    let mut record = RawRecord::new();

    for (name, mut values) in fields {
        let value = if values.len() == 1 {
            let text = values.remove(0);
            if DATE_FIELDS.contains(&name.as_str()) {
                match DateTime::parse_from_rfc3339(&text) {
                    Ok(dt) => RawValue::DateTime(dt),
                    Err(_) => RawValue::Value(serde_json::Value::String(text)),
                }
            } else {
                RawValue::Value(serde_json::Value::String(text))
            }
        } else {
            RawValue::Value(serde_json::Value::Array(
                values.into_iter().map(serde_json::Value::String).collect(),
            ))
        };
        record.insert(name, value);
    }

    record
        .entry("id".to_owned())
        .or_insert_with(|| RawValue::Value(serde_json::Value::String(id.to_string())));
    record
}

fn manufacture_id(fields: &BTreeMap<String, Vec<String>>) -> Uuid {
    let mut name = String::new();
    for (key, values) in fields {
        name.push_str(key);
        name.push('=');
        name.push_str(&values.join(","));
        name.push('\u{1f}');
    }
    Uuid::new_v5(&ACTIVITY_ID_NAMESPACE, name.as_bytes())
}
