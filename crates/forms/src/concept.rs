//! Concept descriptor carried by form controls and observations.
//!
//! The control layer treats a concept as opaque metadata and only ever inspects two tags:
//! the datatype (to decide numeric handling and which widget renders it) and the concept
//! class (to find the abnormal flag inside a group). Every other field is preserved verbatim
//! so an observation tree can be handed back to its host unchanged.
//!
//! Historically the datatype tag has been published under two keys, `datatype` (form
//! definitions) and `dataType` (observations returned by the server). Both are read.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Datatype tag marking a numeric concept.
pub const NUMERIC_DATATYPE: &str = "Numeric";

/// Concept class tag marking the abnormal child of an observation group.
pub const ABNORMAL_CONCEPT_CLASS: &str = "Abnormal";

/// Opaque concept descriptor.
///
/// All fields are optional: malformed or partial metadata degrades to "not numeric" and
/// "not abnormal" instead of failing. A tag that is present but not a string is kept in
/// [`Concept::extra`] under its original key and reads as absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ConceptWire")]
pub struct Concept {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Datatype tag as published by form definitions.
    #[serde(default, rename = "datatype", skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,

    /// Datatype tag as published by the observation service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_class: Option<String>,

    /// Remaining descriptor fields, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Concept as it appears in documents, before the string tags are checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConceptWire {
    #[serde(default, deserialize_with = "present")]
    uuid: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    name: Option<Value>,

    #[serde(default, rename = "datatype", deserialize_with = "present")]
    datatype: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    data_type: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    concept_class: Option<Value>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Keeps an explicit `null` so it is written back.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl From<ConceptWire> for Concept {
    fn from(wire: ConceptWire) -> Self {
        let mut extra = wire.extra;
        let mut tag = |key: &str, value: Option<Value>| match value {
            Some(Value::String(text)) => Some(text),
            Some(other) => {
                tracing::debug!("concept tag '{}' is not a string: {}", key, other);
                extra.insert(key.to_string(), other);
                None
            }
            None => None,
        };

        let uuid = tag("uuid", wire.uuid);
        let name = tag("name", wire.name);
        let datatype = tag("datatype", wire.datatype);
        let data_type = tag("dataType", wire.data_type);
        let concept_class = tag("conceptClass", wire.concept_class);

        Self {
            uuid,
            name,
            datatype,
            data_type,
            concept_class,
            extra,
        }
    }
}

impl Concept {
    /// Creates a concept with a name and a datatype tag.
    pub fn new(name: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            datatype: Some(datatype.into()),
            ..Self::default()
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_concept_class(mut self, concept_class: impl Into<String>) -> Self {
        self.concept_class = Some(concept_class.into());
        self
    }

    /// Returns the datatype tag, preferring `datatype` over `dataType`.
    pub fn datatype_tag(&self) -> Option<&str> {
        self.datatype.as_deref().or(self.data_type.as_deref())
    }

    /// Returns `true` if either datatype key carries the numeric marker.
    pub fn is_numeric(&self) -> bool {
        self.datatype.as_deref() == Some(NUMERIC_DATATYPE)
            || self.data_type.as_deref() == Some(NUMERIC_DATATYPE)
    }

    /// Returns `true` if the concept class is the abnormal marker.
    pub fn is_abnormal(&self) -> bool {
        self.concept_class.as_deref() == Some(ABNORMAL_CONCEPT_CLASS)
    }

    /// Returns `true` if both descriptors denote the same concept.
    ///
    /// Concepts carrying a uuid on both sides are compared by uuid only; otherwise the
    /// descriptors must be structurally equal.
    pub fn same_concept(&self, other: &Concept) -> bool {
        match (&self.uuid, &other.uuid) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Reads the `properties.allowDecimal` flag some numeric concepts carry.
    pub fn allow_decimal(&self) -> Option<bool> {
        self.extra
            .get("properties")
            .and_then(|properties| properties.get("allowDecimal"))
            .and_then(Value::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_is_detected_under_either_key() {
        let from_form: Concept =
            serde_json::from_str(r#"{"name":"Pulse","datatype":"Numeric"}"#).expect("parse");
        let from_server: Concept =
            serde_json::from_str(r#"{"name":"Pulse","dataType":"Numeric"}"#).expect("parse");

        assert!(from_form.is_numeric());
        assert!(from_server.is_numeric());
        assert_eq!(from_server.datatype_tag(), Some("Numeric"));
    }

    #[test]
    fn missing_datatype_is_not_numeric() {
        let concept: Concept = serde_json::from_str(r#"{"name":"Notes"}"#).expect("parse");
        assert!(!concept.is_numeric());
        assert!(!concept.is_abnormal());
        assert_eq!(concept.datatype_tag(), None);
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let input = r#"{"name":"Pulse","datatype":"Numeric","answers":[],"properties":{"allowDecimal":false}}"#;
        let concept: Concept = serde_json::from_str(input).expect("parse");

        assert_eq!(concept.allow_decimal(), Some(false));

        let output = serde_json::to_value(&concept).expect("serialize");
        assert_eq!(output["answers"], serde_json::json!([]));
        assert_eq!(output["properties"]["allowDecimal"], serde_json::json!(false));
        assert!(output.get("dataType").is_none());
    }

    #[test]
    fn non_string_tags_read_as_absent_and_are_kept() {
        let input = serde_json::json!({
            "name": "Pulse",
            "datatype": 5,
            "dataType": null,
            "conceptClass": {"name": "Misc"}
        });
        let concept: Concept = serde_json::from_value(input.clone()).expect("parse");

        assert!(!concept.is_numeric());
        assert!(!concept.is_abnormal());
        assert_eq!(concept.datatype_tag(), None);
        assert_eq!(concept.name.as_deref(), Some("Pulse"));
        assert_eq!(serde_json::to_value(&concept).expect("serialize"), input);
    }

    #[test]
    fn malformed_tags_in_yaml_do_not_fail() {
        let concept: Concept =
            serde_yaml::from_str("name: Pulse\ndatatype: [Numeric]\nconceptClass: Abnormal\n")
                .expect("parse");

        assert!(!concept.is_numeric());
        assert!(concept.is_abnormal());
    }

    #[test]
    fn same_concept_prefers_uuid() {
        let a = Concept::new("Pulse", "Numeric").with_uuid("c1");
        let renamed = Concept::new("Pulse rate", "Numeric").with_uuid("c1");
        let other = Concept::new("Pulse", "Numeric").with_uuid("c2");

        assert!(a.same_concept(&renamed));
        assert!(!a.same_concept(&other));
        assert!(Concept::new("Notes", "Text").same_concept(&Concept::new("Notes", "Text")));
        assert!(!Concept::new("Notes", "Text").same_concept(&Concept::new("Notes", "Coded")));
    }
}
