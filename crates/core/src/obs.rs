//! Observation record.
//!
//! An [`Obs`] is one clinical observation plus its lifecycle metadata. It is an immutable
//! value: every operation consumes the record and returns the next version, so an owner
//! replaces its copy wholesale on each change and never mutates in place.
//!
//! The serialized shape (camelCase field names, nested `groupMembers`) is the contract with
//! the host application and is written back unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::form_namespace::FormFieldPath;
use forms::Concept;

/// A coded answer: a reference to an answer concept, identified by its uuid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CodedAnswer {
    pub uuid: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CodedAnswer {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            extra: Map::new(),
        }
    }
}

/// Value of an observation.
///
/// Whole numbers the host wrote without a fraction stay [`ObsValue::Integer`] so they are
/// written back as `72`, not `72.0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObsValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Coded(CodedAnswer),
}

impl ObsValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ObsValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ObsValue::Integer(number) => Some(*number as f64),
            ObsValue::Number(number) => Some(*number),
            _ => None,
        }
    }
}

impl From<&str> for ObsValue {
    fn from(value: &str) -> Self {
        ObsValue::Text(value.to_string())
    }
}

impl From<String> for ObsValue {
    fn from(value: String) -> Self {
        ObsValue::Text(value)
    }
}

impl From<f64> for ObsValue {
    fn from(value: f64) -> Self {
        ObsValue::Number(value)
    }
}

impl From<i64> for ObsValue {
    fn from(value: i64) -> Self {
        ObsValue::Integer(value)
    }
}

impl From<bool> for ObsValue {
    fn from(value: bool) -> Self {
        ObsValue::Boolean(value)
    }
}

impl From<CodedAnswer> for ObsValue {
    fn from(value: CodedAnswer) -> Self {
        ObsValue::Coded(value)
    }
}

/// One clinical observation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obs {
    #[serde(default)]
    concept: Concept,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    uuid: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<ObsValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    observation_date_time: Option<DateTime<Utc>>,

    #[serde(default)]
    voided: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    form_namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    form_field_path: Option<FormFieldPath>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    group_members: Option<Vec<Obs>>,
}

impl Obs {
    /// Creates a valueless, non-voided observation of `concept`.
    pub fn new(concept: Concept) -> Self {
        Self {
            concept,
            ..Self::default()
        }
    }

    // Construction helpers. These set fields verbatim, without the dirty-check semantics of
    // `set_value`, and are meant for building records from known data.

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn with_value(mut self, value: impl Into<ObsValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_observation_date_time(mut self, at: DateTime<Utc>) -> Self {
        self.observation_date_time = Some(at);
        self
    }

    pub fn with_voided(mut self, voided: bool) -> Self {
        self.voided = voided;
        self
    }

    pub fn with_form_namespace(mut self, form_namespace: impl Into<String>) -> Self {
        self.form_namespace = Some(form_namespace.into());
        self
    }

    pub fn with_form_field_path(mut self, form_field_path: FormFieldPath) -> Self {
        self.form_field_path = Some(form_field_path);
        self
    }

    pub fn concept(&self) -> &Concept {
        &self.concept
    }

    pub fn uuid(&self) -> Option<Uuid> {
        self.uuid
    }

    pub fn value(&self) -> Option<&ObsValue> {
        self.value.as_ref()
    }

    pub fn observation_date_time(&self) -> Option<DateTime<Utc>> {
        self.observation_date_time
    }

    pub fn is_voided(&self) -> bool {
        self.voided
    }

    pub fn form_namespace(&self) -> Option<&str> {
        self.form_namespace.as_deref()
    }

    pub fn form_field_path(&self) -> Option<&FormFieldPath> {
        self.form_field_path.as_ref()
    }

    /// Returns `true` if both records occupy the same slot (same form-field path).
    pub fn same_slot(&self, other: &Obs) -> bool {
        self.form_field_path.is_some() && self.form_field_path == other.form_field_path
    }

    /// Returns `true` if `value` differs from the current value.
    ///
    /// Coded answers are compared by uuid only, so a re-fetched answer with a different
    /// display name is not a change.
    pub fn is_dirty(&self, value: Option<&ObsValue>) -> bool {
        match (&self.value, value) {
            (Some(ObsValue::Coded(current)), Some(ObsValue::Coded(candidate))) => {
                current.uuid != candidate.uuid
            }
            (current, candidate) => current.as_ref() != candidate,
        }
    }

    /// Sets the value.
    ///
    /// A changed value clears the observation time and the void flag. An unchanged value
    /// returns the record as is.
    #[must_use]
    pub fn set_value(self, value: Option<ObsValue>) -> Self {
        if !self.is_dirty(value.as_ref()) {
            return self;
        }
        Self {
            observation_date_time: None,
            value,
            voided: false,
            ..self
        }
    }

    /// Soft-deletes the observation: clears the value and sets the void flag.
    ///
    /// Identity (`uuid`, `formFieldPath`) and the comment are kept.
    #[must_use]
    pub fn void(self) -> Self {
        Self {
            voided: true,
            value: None,
            ..self
        }
    }

    #[must_use]
    pub fn set_comment(self, comment: Option<String>) -> Self {
        Self { comment, ..self }
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    #[must_use]
    pub fn set_form_field_path(self, form_field_path: FormFieldPath) -> Self {
        Self {
            form_field_path: Some(form_field_path),
            ..self
        }
    }

    /// Adds a child observation.
    ///
    /// - a member equal to an existing one leaves the record unchanged
    /// - a member whose concept is already present replaces that member in place
    /// - any other member is appended
    #[must_use]
    pub fn add_group_member(self, member: Obs) -> Self {
        let mut group_members = self.group_members.clone().unwrap_or_default();

        if group_members.contains(&member) {
            return self;
        }

        match group_members
            .iter()
            .position(|existing| existing.concept.same_concept(&member.concept))
        {
            Some(index) => group_members[index] = member,
            None => group_members.push(member),
        }

        Self {
            group_members: Some(group_members),
            ..self
        }
    }

    pub fn group_members(&self) -> Option<&[Obs]> {
        self.group_members.as_deref()
    }

    #[must_use]
    pub fn remove_group_members(self) -> Self {
        Self {
            group_members: None,
            ..self
        }
    }

    /// Returns `true` if the concept carries the numeric datatype tag under either key.
    pub fn is_numeric(&self) -> bool {
        self.concept.is_numeric()
    }

    /// First group member whose concept is of the abnormal class.
    ///
    /// Returns `None` for records without group members.
    pub fn abnormal_child_obs(&self) -> Option<&Obs> {
        self.group_members
            .as_deref()?
            .iter()
            .find(|member| member.concept.is_abnormal())
    }

    /// The wire document for this record.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
