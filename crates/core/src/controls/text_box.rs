use std::sync::Arc;

use super::{Control, ControlHost, ControlInput, ControlLifecycle, ControlProps, InputOutcome};
use crate::constants::TEXT_CONTROL_KEY;
use crate::obs::ObsValue;
use crate::validator::{ControlError, Validator};

/// Free-text widget.
pub struct TextBox {
    lifecycle: ControlLifecycle,
}

impl TextBox {
    pub fn new(props: ControlProps, validator: Arc<dyn Validator>) -> Self {
        Self {
            lifecycle: ControlLifecycle::new(props, validator),
        }
    }

    /// Registry factory.
    pub fn create(props: ControlProps, validator: Arc<dyn Validator>) -> Box<dyn Control> {
        Box::new(Self::new(props, validator))
    }

    /// Trims the input; blank input is no value.
    pub fn normalize(raw: &str) -> Option<ObsValue> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| ObsValue::Text(trimmed.to_string()))
    }

    /// Text shown in the box; empty when there is no value.
    pub fn display_value(&self) -> String {
        match &self.lifecycle.props().value {
            None => String::new(),
            Some(ObsValue::Text(text)) => text.clone(),
            Some(ObsValue::Integer(number)) => number.to_string(),
            Some(ObsValue::Number(number)) => number.to_string(),
            Some(ObsValue::Boolean(flag)) => flag.to_string(),
            Some(ObsValue::Coded(answer)) => answer.uuid.clone(),
        }
    }
}

impl Control for TextBox {
    fn kind(&self) -> &'static str {
        TEXT_CONTROL_KEY
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
        match input {
            ControlInput::Text(raw) => {
                self.lifecycle.input(Self::normalize(&raw), host);
                InputOutcome::Handled
            }
            other => {
                tracing::warn!(
                    "text control at {} ignores {:?}",
                    self.lifecycle.props().form_field_path,
                    other
                );
                InputOutcome::Ignored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::test_support::RecordingHost;
    use crate::form_namespace::FormFieldPath;
    use crate::validator::RuleValidator;
    use forms::Validation;

    fn text_box(path: &str, validations: Vec<Validation>) -> TextBox {
        let props = ControlProps::new(FormFieldPath::parse(path).expect("valid path"))
            .with_validations(validations);
        TextBox::new(props, Arc::new(RuleValidator))
    }

    #[test]
    fn normalize_trims_and_drops_blank_input() {
        assert_eq!(TextBox::normalize("  42  "), Some("42".into()));
        assert_eq!(TextBox::normalize("   "), None);
        assert_eq!(TextBox::normalize(""), None);
    }

    #[test]
    fn mandatory_original_notifies_on_mount() {
        let mut control = text_box("form1.1/1-0", vec![Validation::Mandatory]);
        let mut host = RecordingHost::default();

        control.mount(&mut host);

        assert_eq!(
            host.changes,
            vec![(None, vec![ControlError::error(Validation::Mandatory)])]
        );
    }

    #[test]
    fn mandatory_clone_is_silent_on_mount() {
        let mut control = text_box("form1.1/1-1", vec![Validation::Mandatory]);
        let mut host = RecordingHost::default();

        control.mount(&mut host);

        assert!(host.changes.is_empty());
        assert!(!control.has_errors());
    }

    #[test]
    fn typed_value_is_trimmed_and_notified_once() {
        let mut control = text_box("form1.1/1-0", vec![]);
        let mut host = RecordingHost::default();

        let outcome = control.handle_input(ControlInput::Text("  42  ".into()), &mut host);

        assert_eq!(outcome, InputOutcome::Handled);
        assert_eq!(host.changes, vec![(Some("42".into()), vec![])]);
        assert_eq!(control.display_value(), "42");
    }

    #[test]
    fn clearing_mandatory_text_reports_error() {
        let mut control = text_box("form1.1/1-0", vec![Validation::Mandatory]);
        let mut host = RecordingHost::default();

        control.handle_input(ControlInput::Text("  ".into()), &mut host);

        assert!(control.has_errors());
        assert_eq!(
            host.changes,
            vec![(None, vec![ControlError::error(Validation::Mandatory)])]
        );
    }

    #[test]
    fn same_value_twice_updates_once() {
        let mut control = text_box("form1.1/1-0", vec![]);
        let mut host = RecordingHost::default();
        let next = control.props().clone().with_value(Some("x".into()));

        let updates = [
            control.receive_props(next.clone(), &mut host),
            control.receive_props(next, &mut host),
        ];

        assert_eq!(updates, [true, false]);
        assert!(host.changes.is_empty());
    }

    #[test]
    fn disabled_control_ignores_input() {
        let props = ControlProps::new(FormFieldPath::parse("form1.1/1-0").expect("valid path"))
            .with_enabled(false);
        let mut control = TextBox::new(props, Arc::new(RuleValidator));
        let mut host = RecordingHost::default();

        let outcome = control.handle_input(ControlInput::Text("typed".into()), &mut host);

        assert_eq!(outcome, InputOutcome::Ignored);
        assert!(host.changes.is_empty());
    }

    #[test]
    fn file_input_is_ignored() {
        let mut control = text_box("form1.1/1-0", vec![]);
        let mut host = RecordingHost::default();

        assert_eq!(
            control.handle_input(ControlInput::Delete, &mut host),
            InputOutcome::Ignored
        );
    }
}
