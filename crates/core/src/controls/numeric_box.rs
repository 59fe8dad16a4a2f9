use std::sync::Arc;

use super::{Control, ControlHost, ControlInput, ControlLifecycle, ControlProps, InputOutcome};
use crate::constants::NUMERIC_CONTROL_KEY;
use crate::obs::ObsValue;
use crate::validator::{ControlError, Validator};

/// Numeric entry widget. Whole numbers are recorded as integers.
pub struct NumericBox {
    lifecycle: ControlLifecycle,
}

impl NumericBox {
    pub fn new(props: ControlProps, validator: Arc<dyn Validator>) -> Self {
        Self {
            lifecycle: ControlLifecycle::new(props, validator),
        }
    }

    /// Registry factory.
    pub fn create(props: ControlProps, validator: Arc<dyn Validator>) -> Box<dyn Control> {
        Box::new(Self::new(props, validator))
    }

    /// Parses typed text. Blank input is no value; text that is not a finite number is
    /// rejected with `Err`.
    pub fn normalize(raw: &str) -> Result<Option<ObsValue>, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if let Ok(whole) = trimmed.parse::<i64>() {
            return Ok(Some(ObsValue::Integer(whole)));
        }
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Some(ObsValue::Number(number))),
            _ => Err(trimmed.to_string()),
        }
    }

    pub fn display_value(&self) -> String {
        self.lifecycle
            .props()
            .value
            .as_ref()
            .and_then(ObsValue::as_number)
            .map(|number| number.to_string())
            .unwrap_or_default()
    }
}

impl Control for NumericBox {
    fn kind(&self) -> &'static str {
        NUMERIC_CONTROL_KEY
    }

    fn props(&self) -> &ControlProps {
        self.lifecycle.props()
    }

    fn has_errors(&self) -> bool {
        self.lifecycle.has_errors()
    }

    fn errors(&self) -> Vec<ControlError> {
        self.lifecycle.errors()
    }

    fn mount(&mut self, host: &mut dyn ControlHost) {
        self.lifecycle.mount(host);
    }

    fn receive_props(&mut self, next: ControlProps, host: &mut dyn ControlHost) -> bool {
        self.lifecycle.receive_props(next, host)
    }

    fn handle_input(&mut self, input: ControlInput, host: &mut dyn ControlHost) -> InputOutcome {
        if !self.lifecycle.props().enabled {
            return InputOutcome::Ignored;
        }
        let raw = match input {
            ControlInput::Text(raw) => raw,
            other => {
                tracing::warn!(
                    "numeric control at {} ignores {:?}",
                    self.lifecycle.props().form_field_path,
                    other
                );
                return InputOutcome::Ignored;
            }
        };
        match Self::normalize(&raw) {
            Ok(value) => {
                self.lifecycle.input(value, host);
                InputOutcome::Handled
            }
            Err(text) => {
                tracing::warn!(
                    "numeric control at {} rejected '{}'",
                    self.lifecycle.props().form_field_path,
                    text
                );
                InputOutcome::Ignored
            }
        }
    }
}
