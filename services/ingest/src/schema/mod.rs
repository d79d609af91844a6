//! Record schemas and the field projection applied to every record.

pub mod activity;
pub mod selector;

use std::collections::BTreeMap;
use std::path::Path;

use bronto_common::error::{BrontoError, BrontoResult};
use serde::{Deserialize, Serialize};

pub use selector::{build_selector, format_timestamp, FieldSelector, ProjectedRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Null,
    String,
    Boolean,
    Number,
    Integer,
    Array,
    Object,
}

/// Whether a field can be left out by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Inclusion {
    /// Always emitted.
    Automatic,
    /// Emitted when selected, or when unselected and selected by default.
    Available,
    /// Never emitted.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub inclusion: Inclusion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(
        rename = "selected-by-default",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_by_default: Option<bool>,
}

impl FieldMetadata {
    /// Explicit selection wins over the default flag; automatic fields are
    /// always in.
    pub fn is_selected(&self) -> bool {
        match self.inclusion {
            Inclusion::Automatic => true,
            Inclusion::Available => match self.selected {
                Some(selected) => selected,
                None => self.selected_by_default == Some(true),
            },
            Inclusion::Unsupported => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub types: Vec<FieldType>,
    pub description: String,
    pub metadata: FieldMetadata,
}

/// JSON-schema shaped description of one stream's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub properties: BTreeMap<String, FieldSchema>,
    pub metadata: FieldMetadata,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

pub fn is_selected(field: &FieldSchema) -> bool {
    field.metadata.is_selected()
}

/// Operator field selections, read from a catalog file shaped like
/// `{"streams": {"inbound_activity": {"emailAddress": false}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogSelection {
    #[serde(default)]
    pub streams: BTreeMap<String, BTreeMap<String, bool>>,
}

impl CatalogSelection {
    pub fn load(path: &Path) -> BrontoResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BrontoError::Config(format!("cannot read catalog {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this catalog's choices for `stream` into the schema's `selected` flags.
    pub fn apply(&self, stream: &str, schema: &mut RecordSchema) {
        let Some(selections) = self.streams.get(stream) else {
            return;
        };

        for (field, selected) in selections {
            match schema.properties.get_mut(field) {
                Some(f) => {
                    if f.metadata.inclusion == Inclusion::Automatic && !selected {
                        tracing::warn!(stream, field = %field, "automatic field cannot be deselected");
                    }
                    f.metadata.selected = Some(*selected);
                }
                None => {
                    tracing::warn!(stream, field = %field, "catalog names unknown field, ignoring");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(
        inclusion: Inclusion,
        selected: Option<bool>,
        selected_by_default: Option<bool>,
    ) -> FieldMetadata {
        FieldMetadata {
            inclusion,
            selected,
            selected_by_default,
        }
    }

    #[test]
    fn explicit_selection_includes_available_field() {
        assert!(meta(Inclusion::Available, Some(true), Some(false)).is_selected());
        assert!(meta(Inclusion::Available, Some(true), None).is_selected());
    }

    #[test]
    fn default_flag_applies_only_when_unselected() {
        assert!(meta(Inclusion::Available, None, Some(true)).is_selected());
        assert!(!meta(Inclusion::Available, None, Some(false)).is_selected());
        assert!(!meta(Inclusion::Available, None, None).is_selected());
    }

    #[test]
    fn explicit_deselection_beats_default() {
        assert!(!meta(Inclusion::Available, Some(false), Some(true)).is_selected());
    }

    #[test]
    fn automatic_fields_cannot_be_excluded() {
        assert!(meta(Inclusion::Automatic, Some(false), None).is_selected());
        assert!(meta(Inclusion::Automatic, None, Some(false)).is_selected());
    }

    #[test]
    fn unsupported_fields_never_selected() {
        assert!(!meta(Inclusion::Unsupported, Some(true), Some(true)).is_selected());
    }

    #[test]
    fn metadata_uses_hyphenated_default_key() {
        let m: FieldMetadata = serde_json::from_value(serde_json::json!({
            "inclusion": "available",
            "selected-by-default": true
        }))
        .expect("should deserialize");
        assert_eq!(m, meta(Inclusion::Available, None, Some(true)));

        let back = serde_json::to_value(&m).expect("serialize");
        assert_eq!(
            back,
            serde_json::json!({"inclusion": "available", "selected-by-default": true})
        );
    }

    #[test]
    fn catalog_sets_selected_flags() {
        let mut schema = activity::activity_schema();
        let catalog: CatalogSelection = serde_json::from_value(serde_json::json!({
            "streams": {
                "inbound_activity": {"emailAddress": false, "id": false, "nope": true},
                "outbound_activity": {"linkUrl": false}
            }
        }))
        .expect("catalog");

        catalog.apply("inbound_activity", &mut schema);

        let email = &schema.properties["emailAddress"];
        assert_eq!(email.metadata.selected, Some(false));
        assert!(!is_selected(email));
        assert!(is_selected(&schema.properties["id"]));
        assert!(is_selected(&schema.properties["linkUrl"]));
        assert!(!schema.properties.contains_key("nope"));
    }

    #[test]
    fn catalog_load_reports_missing_file() {
        let err = CatalogSelection::load(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(matches!(err, BrontoError::Config(_)));
    }
}
