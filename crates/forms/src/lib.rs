//! Form definition wire/boundary support.
//!
//! This crate is responsible for translating between form definition documents (YAML or JSON,
//! as published by the form builder) and the typed metadata the control layer consumes:
//! - the opaque concept descriptor carried by controls and observations
//! - the form definition itself (name, version, controls and their properties)
//! - validation rule identifiers derived from control properties
//!
//! Observation state and control behaviour live in `form-controls-core`. This crate handles
//! document formats and metadata only.

pub mod concept;
pub mod definition;
pub mod validation;

pub use concept::{Concept, ABNORMAL_CONCEPT_CLASS, NUMERIC_DATATYPE};
pub use definition::{
    ControlDefinition, ControlProperties, FormDefinition, FormName, OBS_CONTROL_TYPE,
};
pub use validation::Validation;

use thiserror::Error;

/// Errors returned by the `forms` boundary crate.
#[derive(Debug, Error)]
pub enum FormsError {
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FormsError`].
pub type FormsResult<T> = Result<T, FormsError>;

/// Read a form definition from YAML.
pub fn read_form_yaml(yaml: &str) -> FormsResult<FormDefinition> {
    FormDefinition::parse_yaml(yaml)
}

/// Read a form definition from JSON.
pub fn read_form_json(json: &str) -> FormsResult<FormDefinition> {
    FormDefinition::parse_json(json)
}

/// Write a form definition to YAML.
pub fn write_form_yaml(definition: &FormDefinition) -> FormsResult<String> {
    definition.render_yaml()
}
