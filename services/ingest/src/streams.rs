use std::fmt;
use std::str::FromStr;

use bronto_common::error::BrontoError;

use crate::bronto::models::ActivityKind;
use crate::schema::activity::activity_schema;
use crate::schema::RecordSchema;

/// Streams this tap can sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    InboundActivity,
    OutboundActivity,
}

impl StreamKind {
    pub const ALL: [StreamKind; 2] = [StreamKind::InboundActivity, StreamKind::OutboundActivity];

    pub fn name(self) -> &'static str {
        match self {
            StreamKind::InboundActivity => "inbound_activity",
            StreamKind::OutboundActivity => "outbound_activity",
        }
    }

    pub fn activity_kind(self) -> ActivityKind {
        match self {
            StreamKind::InboundActivity => ActivityKind::Inbound,
            StreamKind::OutboundActivity => ActivityKind::Outbound,
        }
    }

    pub fn key_properties(self) -> &'static [&'static str] {
        &["id"]
    }

    pub fn bookmark_key(self) -> &'static str {
        "createdDate"
    }

    pub fn schema(self) -> RecordSchema {
        activity_schema()
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StreamKind {
    type Err = BrontoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StreamKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = StreamKind::ALL.iter().map(|k| k.name()).collect();
                BrontoError::Config(format!(
                    "unknown stream {s:?}, expected one of: {}",
                    known.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_streams() {
        assert_eq!(
            "inbound_activity".parse::<StreamKind>().unwrap(),
            StreamKind::InboundActivity
        );
        assert_eq!(
            "outbound_activity".parse::<StreamKind>().unwrap(),
            StreamKind::OutboundActivity
        );
    }

    #[test]
    fn parse_is_case_sensitive() {
        let err = "Inbound_Activity".parse::<StreamKind>().unwrap_err();
        assert!(err.to_string().contains("unknown stream"), "got: {err}");
    }

    #[test]
    fn activity_streams_map_to_feeds() {
        assert_eq!(
            StreamKind::OutboundActivity.activity_kind(),
            ActivityKind::Outbound
        );
        assert_eq!(StreamKind::InboundActivity.bookmark_key(), "createdDate");
        assert_eq!(StreamKind::InboundActivity.key_properties(), &["id"]);
    }
}
