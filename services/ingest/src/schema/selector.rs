use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, TimeZone};
use serde_json::Value;

use super::{is_selected, RecordSchema};
use crate::bronto::models::{RawRecord, RawValue};

pub type ProjectedRecord = serde_json::Map<String, Value>;

/// Second-precision ISO-8601 with a `+HH:MM` offset, e.g. `2020-01-01T00:00:00+00:00`.
pub fn format_timestamp<Tz>(dt: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Reduces raw records to the fields selected in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    fields: BTreeSet<String>,
}

impl FieldSelector {
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Keep only selected keys; date values are rendered with [`format_timestamp`].
    /// Absent keys stay absent.
    pub fn project(&self, raw: &RawRecord) -> ProjectedRecord {
        raw.iter()
            .filter(|(name, _)| self.contains(name))
            .map(|(name, value)| {
                let value = match value {
                    RawValue::DateTime(dt) => Value::String(format_timestamp(dt)),
                    RawValue::Value(v) => v.clone(),
                };
                (name.clone(), value)
            })
            .collect()
    }
}

/// Compute the selected field set once for a run.
pub fn build_selector(schema: &RecordSchema) -> FieldSelector {
    let fields = schema
        .properties
        .iter()
        .filter(|(_, field)| is_selected(field))
        .map(|(name, _)| name.clone())
        .collect();
    FieldSelector { fields }
}
