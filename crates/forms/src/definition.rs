//! Form definition documents.
//!
//! A form definition names a form, carries its published version and lists the controls it
//! renders. Each control binds one concept; its properties decide which validation rules
//! apply and whether the control can be repeated ("add more").
//!
//! Responsibilities:
//! - Strict parsing of YAML/JSON documents with a field path on schema mismatch
//! - Validation of every piece that is embedded into a form-field path
//! - Deriving rule identifiers and the widget registry key for a control
//!
//! Notes:
//! - Unknown control fields (labels, units, layout hints) are ignored on read
//! - Control ids must be unique within a form

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::concept::Concept;
use crate::validation::{validate_path_component, Validation};
use crate::{FormsError, FormsResult};

/// Control type of controls bound to an observation. Other types (labels, sections) only
/// carry layout.
pub const OBS_CONTROL_TYPE: &str = "obsControl";

/// A validated form name.
///
/// The name is trimmed on construction and is guaranteed to be usable as the first
/// component of a form-field path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FormName(String);

impl FormName {
    /// Creates a `FormName`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`FormsError::InvalidInput`] if the trimmed name is empty, too long or
    /// contains `/`.
    pub fn new(input: impl AsRef<str>) -> FormsResult<Self> {
        let trimmed = input.as_ref().trim();
        validate_path_component("form name", trimmed)?;
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FormName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for FormName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FormName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FormName::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Properties of a control as published by the form builder.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlProperties {
    #[serde(default)]
    pub mandatory: bool,

    /// The control may be repeated by the user.
    #[serde(default)]
    pub add_more: bool,

    #[serde(default)]
    pub notes: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One control of a form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlDefinition {
    pub id: String,

    /// Form-builder control type (for example `obsControl`).
    #[serde(rename = "type")]
    pub control_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<Concept>,

    #[serde(default)]
    pub properties: ControlProperties,
}

impl ControlDefinition {
    /// Creates an observation control bound to `concept`.
    pub fn obs_control(id: impl Into<String>, concept: Concept) -> Self {
        Self {
            id: id.into(),
            control_type: OBS_CONTROL_TYPE.into(),
            concept: Some(concept),
            properties: ControlProperties::default(),
        }
    }

    pub fn is_obs_control(&self) -> bool {
        self.control_type == OBS_CONTROL_TYPE
    }

    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.properties.mandatory = mandatory;
        self
    }

    pub fn add_more(mut self, add_more: bool) -> Self {
        self.properties.add_more = add_more;
        self
    }

    /// Rule identifiers implied by the control's properties and concept.
    pub fn validations(&self) -> Vec<Validation> {
        let mut validations = Vec::new();
        if self.properties.mandatory {
            validations.push(Validation::Mandatory);
        }
        if let Some(concept) = &self.concept {
            if concept.is_numeric() && concept.allow_decimal() == Some(false) {
                validations.push(Validation::AllowDecimal);
            }
        }
        validations
    }

    /// Registry key of the widget that renders this control: the lowercase datatype tag.
    ///
    /// Returns `None` when the control has no concept or the concept has no datatype.
    pub fn widget_key(&self) -> Option<String> {
        self.concept
            .as_ref()
            .and_then(Concept::datatype_tag)
            .map(str::to_lowercase)
    }
}

/// Version as it appears in documents: YAML authors tend to write a bare integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum VersionWire {
    Text(String),
    Number(u64),
}

fn deserialize_version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let version = match VersionWire::deserialize(deserializer)? {
        VersionWire::Text(text) => text.trim().to_owned(),
        VersionWire::Number(number) => number.to_string(),
    };
    validate_path_component("form version", &version).map_err(serde::de::Error::custom)?;
    Ok(version)
}

/// A published form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub name: FormName,

    #[serde(deserialize_with = "deserialize_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default)]
    pub controls: Vec<ControlDefinition>,
}

impl FormDefinition {
    /// Creates an empty form definition.
    ///
    /// # Errors
    ///
    /// Returns [`FormsError::InvalidInput`] if the name or version cannot be embedded into a
    /// form-field path.
    pub fn new(name: &str, version: &str) -> FormsResult<Self> {
        let version = version.trim();
        validate_path_component("form version", version)?;
        Ok(Self {
            name: FormName::new(name)?,
            version: version.to_owned(),
            uuid: None,
            controls: Vec::new(),
        })
    }

    /// Appends a control, rejecting invalid or duplicate ids.
    pub fn with_control(mut self, control: ControlDefinition) -> FormsResult<Self> {
        self.controls.push(control);
        self.validate()?;
        Ok(self)
    }

    /// Looks up a control by id.
    pub fn control(&self, id: &str) -> Option<&ControlDefinition> {
        self.controls.iter().find(|control| control.id == id)
    }

    /// Parse a form definition from YAML text.
    ///
    /// This uses `serde_path_to_error` to surface the path (e.g. `controls[1].properties`) to
    /// the failing field when the YAML does not match the schema.
    ///
    /// # Errors
    ///
    /// Returns [`FormsError::Translation`] on a schema mismatch and
    /// [`FormsError::InvalidInput`] when control ids are invalid or duplicated.
    pub fn parse_yaml(yaml_text: &str) -> FormsResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let definition: Self = serde_path_to_error::deserialize(deserializer)
            .map_err(|err| schema_mismatch(err.path().to_string(), err.into_inner()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Parse a form definition from JSON text.
    ///
    /// # Errors
    ///
    /// Same as [`FormDefinition::parse_yaml`].
    pub fn parse_json(json_text: &str) -> FormsResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let definition: Self = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|err| schema_mismatch(err.path().to_string(), err.into_inner()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Render the form definition as YAML text.
    pub fn render_yaml(&self) -> FormsResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> FormsResult<()> {
        let mut seen = HashSet::new();
        for control in &self.controls {
            validate_path_component("control id", &control.id)?;
            if !seen.insert(control.id.as_str()) {
                return Err(FormsError::InvalidInput(format!(
                    "duplicate control id '{}' in form '{}'",
                    control.id, self.name
                )));
            }
            if control.concept.is_none() {
                tracing::warn!(
                    "control '{}' of form '{}' has no concept",
                    control.id,
                    self.name
                );
            }
        }
        Ok(())
    }
}

fn schema_mismatch(path: String, source: impl fmt::Display) -> FormsError {
    let path = if path.is_empty() || path == "." {
        "<root>".to_string()
    } else {
        path
    };
    FormsError::Translation(format!("Form definition schema mismatch at {path}: {source}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VITALS_YAML: &str = r#"name: Vitals
version: 1
controls:
  - id: "1"
    type: obsControl
    concept:
      name: Pulse
      uuid: c-pulse
      datatype: Numeric
      properties:
        allowDecimal: false
    properties:
      mandatory: true
  - id: "2"
    type: obsControl
    label:
      value: Notes
    concept:
      name: Notes
      datatype: Text
    properties:
      addMore: true
"#;

    #[test]
    fn parses_yaml_definition() {
        let form = FormDefinition::parse_yaml(VITALS_YAML).expect("parse yaml");

        assert_eq!(form.name.as_str(), "Vitals");
        assert_eq!(form.version, "1");
        assert_eq!(form.controls.len(), 2);

        let pulse = form.control("1").expect("pulse control");
        assert_eq!(
            pulse.validations(),
            vec![Validation::Mandatory, Validation::AllowDecimal]
        );
        assert_eq!(pulse.widget_key().as_deref(), Some("numeric"));

        let notes = form.control("2").expect("notes control");
        assert!(notes.properties.add_more);
        assert!(notes.validations().is_empty());
        assert_eq!(notes.widget_key().as_deref(), Some("text"));
    }

    #[test]
    fn parses_json_definition_with_string_version() {
        let json = r#"{"name":"Vitals","version":"3","uuid":"f-1","controls":[
            {"id":"7","type":"obsControl","concept":{"name":"Photo","datatype":"Complex"}}
        ]}"#;

        let form = FormDefinition::parse_json(json).expect("parse json");
        assert_eq!(form.version, "3");
        assert_eq!(form.uuid.as_deref(), Some("f-1"));
        assert_eq!(
            form.control("7").and_then(ControlDefinition::widget_key).as_deref(),
            Some("complex")
        );
    }

    #[test]
    fn schema_mismatch_reports_field_path() {
        let yaml = r#"name: Vitals
version: 1
controls:
  - id: [1, 2]
    type: obsControl
"#;

        let err = FormDefinition::parse_yaml(yaml).expect_err("should reject wrong type");
        match err {
            FormsError::Translation(msg) => assert!(msg.contains("controls[0].id"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_control_ids() {
        let yaml = r#"name: Vitals
version: 1
controls:
  - id: "1"
    type: obsControl
  - id: "1"
    type: obsControl
"#;

        let err = FormDefinition::parse_yaml(yaml).expect_err("should reject duplicates");
        assert!(matches!(err, FormsError::InvalidInput(msg) if msg.contains("duplicate control id")));
    }

    #[test]
    fn rejects_names_that_break_paths() {
        assert!(FormName::new("Vitals/Extra").is_err());
        assert!(FormDefinition::new("Vitals", "").is_err());
        assert_eq!(FormName::new("  Vitals ").expect("trimmed").as_str(), "Vitals");
    }

    #[test]
    fn builder_round_trips_through_yaml() {
        let form = FormDefinition::new("Vitals", "2")
            .and_then(|form| {
                form.with_control(
                    ControlDefinition::obs_control("1", Concept::new("Notes", "Text"))
                        .mandatory(true),
                )
            })
            .expect("build form");

        let yaml = form.render_yaml().expect("render");
        let reparsed = FormDefinition::parse_yaml(&yaml).expect("reparse");
        assert_eq!(form, reparsed);
    }
}
