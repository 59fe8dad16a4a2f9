//! Validation rule identifiers and input validation utilities.
//!
//! Rule identifiers are the values a form definition implies for a control (for example a
//! mandatory control carries [`Validation::Mandatory`]). They are passed to the validator
//! together with the current value; this crate never evaluates them.
//!
//! The input validators guard the pieces that end up embedded in a form-field path
//! (`<formName>.<formVersion>/<controlId>-<repeatIndex>`).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FormsError, FormsResult};

/// A validation rule identifier attached to a control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Validation {
    /// A value must be present.
    Mandatory,
    /// Numeric values must be whole numbers. The identifier name follows the form builder,
    /// which attaches it when the concept disallows decimals.
    AllowDecimal,
    /// Any identifier this crate does not know about. Ignored by the built-in validator.
    #[serde(other)]
    Unknown,
}

impl Validation {
    /// The wire identifier of the rule, also used as the error message.
    pub fn as_str(&self) -> &'static str {
        match self {
            Validation::Mandatory => "mandatory",
            Validation::AllowDecimal => "allowDecimal",
            Validation::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates a component that is embedded into a form-field path.
///
/// - Rejects empty or whitespace-only strings
/// - Bounds the length to avoid pathological inputs
/// - Rejects `/`, which separates the form prefix from the control segment
///
/// # Errors
///
/// Returns a `FormsError::InvalidInput` naming `field` if the component is invalid.
pub fn validate_path_component(field: &str, value: &str) -> FormsResult<()> {
    const MAX_COMPONENT_LEN: usize = 255;

    if value.trim().is_empty() {
        return Err(FormsError::InvalidInput(format!("{field} cannot be empty")));
    }

    if value.len() > MAX_COMPONENT_LEN {
        return Err(FormsError::InvalidInput(format!(
            "{field} exceeds maximum length of {} characters",
            MAX_COMPONENT_LEN
        )));
    }

    if value.contains('/') {
        return Err(FormsError::InvalidInput(format!(
            "{field} must not contain '/'"
        )));
    }

    Ok(())
}
