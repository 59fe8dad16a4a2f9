//! Validation seam.
//!
//! Controls never encode rule logic. They hand the rule identifiers and the candidate value
//! to a [`Validator`] and treat an empty result as "valid". Errors are data: they travel up
//! with the change notification and are never returned as `Err`.

use serde::{Deserialize, Serialize};

use crate::obs::ObsValue;
use forms::Validation;

/// Severity of a [`ControlError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Error,
    Warning,
}

/// A validation failure reported by a validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,

    /// Rule identifier that failed (for example `mandatory`). Hosts map it to user-facing text.
    pub message: String,
}

impl ControlError {
    pub fn error(validation: Validation) -> Self {
        Self {
            kind: ErrorKind::Error,
            message: validation.as_str().to_string(),
        }
    }
}

/// Input of a validation run.
#[derive(Clone, Copy, Debug)]
pub struct ControlDetails<'a> {
    pub validations: &'a [Validation],
    pub value: Option<&'a ObsValue>,
}

/// The external rule engine.
pub trait Validator: Send + Sync {
    /// Returns the errors for `details`; order is irrelevant, emptiness means valid.
    fn get_errors(&self, details: &ControlDetails<'_>) -> Vec<ControlError>;
}

/// Built-in validator for the rule identifiers form definitions produce.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleValidator;

impl RuleValidator {
    fn check(validation: Validation, value: Option<&ObsValue>) -> Option<ControlError> {
        match validation {
            Validation::Mandatory => {
                let missing = match value {
                    None => true,
                    Some(ObsValue::Text(text)) => text.trim().is_empty(),
                    Some(_) => false,
                };
                missing.then(|| ControlError::error(validation))
            }
            Validation::AllowDecimal => {
                let number = match value {
                    Some(ObsValue::Text(text)) => text.trim().parse::<f64>().ok(),
                    Some(other) => other.as_number(),
                    None => None,
                };
                number
                    .filter(|number| number.fract() != 0.0)
                    .map(|_| ControlError::error(validation))
            }
            Validation::Unknown => {
                tracing::debug!("skipping unknown validation rule");
                None
            }
        }
    }
}

impl Validator for RuleValidator {
    fn get_errors(&self, details: &ControlDetails<'_>) -> Vec<ControlError> {
        details
            .validations
            .iter()
            .filter_map(|validation| Self::check(*validation, details.value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(validations: &[Validation], value: Option<ObsValue>) -> Vec<ControlError> {
        RuleValidator.get_errors(&ControlDetails {
            validations,
            value: value.as_ref(),
        })
    }

    #[test]
    fn mandatory_rejects_absent_and_blank_values() {
        let mandatory = [Validation::Mandatory];
        assert_eq!(
            errors(&mandatory, None),
            vec![ControlError::error(Validation::Mandatory)]
        );
        assert_eq!(errors(&mandatory, Some("   ".into())).len(), 1);
        assert!(errors(&mandatory, Some("42".into())).is_empty());
        assert!(errors(&mandatory, Some(false.into())).is_empty());
    }

    #[test]
    fn allow_decimal_rejects_fractions() {
        let rule = [Validation::AllowDecimal];
        assert_eq!(
            errors(&rule, Some(ObsValue::Number(36.6))),
            vec![ControlError::error(Validation::AllowDecimal)]
        );
        assert_eq!(errors(&rule, Some("36.6".into())).len(), 1);
        assert!(errors(&rule, Some(ObsValue::Number(72.0))).is_empty());
        assert!(errors(&rule, Some(ObsValue::Integer(72))).is_empty());
        assert!(errors(&rule, Some("not a number".into())).is_empty());
        assert!(errors(&rule, None).is_empty());
    }

    #[test]
    fn no_rules_means_no_errors() {
        assert!(errors(&[], None).is_empty());
        assert!(errors(&[Validation::Unknown], None).is_empty());
    }

    #[test]
    fn error_wire_shape_matches_host_expectation() {
        let json = serde_json::to_value(ControlError::error(Validation::Mandatory))
            .expect("serialize");
        assert_eq!(json, serde_json::json!({"type": "error", "message": "mandatory"}));
    }
}
