//! # Form Controls Core
//!
//! Observation state model and control lifecycle for clinical data-entry forms.
//!
//! This crate contains:
//! - [`Obs`]: an immutable observation record with dirty tracking, voiding and group members
//! - [`ObsList`]: the collection behind repeatable ("add more") controls
//! - form-field paths and the resolver binding a control to its observation
//! - the widget contract and lifecycle ([`controls`]), with the built-in text and image
//!   widgets
//! - [`FormSession`]: a mounted form routing input, uploads and validation to its controls
//!
//! **No rendering or transport concerns**: widgets expose display state only, validation
//! rules and uploads are injected through the [`Validator`] and [`FileUploader`] traits.

pub mod config;
pub mod constants;
pub mod controls;
pub mod error;
pub mod form_namespace;
pub mod obs;
pub mod obs_control;
pub mod obs_list;
pub mod registry;
pub mod session;
pub mod upload;
pub mod validator;

pub use config::CoreConfig;
pub use controls::{
    Control, ControlHost, ControlInput, ControlLifecycle, ControlProps, FileSelection, Image,
    InputOutcome, Notification, NumericBox, PendingUpload, TextBox,
};
pub use error::{FormError, FormResult};
pub use form_namespace::{
    create_form_namespace_and_path, create_obs_from_control, obs_from_metadata, FormFieldPath,
    FormNamespaceAndPath,
};
pub use obs::{CodedAnswer, Obs, ObsValue};
pub use obs_control::{ObsControl, ObsEvent};
pub use obs_list::ObsList;
pub use registry::{register_default_controls, ComponentStore, ControlFactory};
pub use session::FormSession;
pub use upload::FileUploader;
pub use validator::{ControlDetails, ControlError, ErrorKind, RuleValidator, Validator};

/// Parses a JSON array of observations as persisted by the host.
///
/// # Errors
///
/// Returns [`FormError::Deserialization`] if the document is not an array of observations.
pub fn read_observations(json: &str) -> FormResult<Vec<Obs>> {
    serde_json::from_str(json).map_err(FormError::Deserialization)
}

/// Renders observations as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`FormError::Serialization`] if a value cannot be represented as JSON.
pub fn write_observations(observations: &[Obs]) -> FormResult<String> {
    serde_json::to_string_pretty(observations).map_err(FormError::Serialization)
}
