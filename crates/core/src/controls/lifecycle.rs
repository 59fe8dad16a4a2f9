use std::sync::Arc;

use super::{ControlHost, ControlProps};
use crate::obs::ObsValue;
use crate::validator::{ControlDetails, ControlError, Validator};

/// State shared by every widget: the last-rendered props and whether they carry errors.
///
/// Widgets wrap a `ControlLifecycle` and add only their own input handling.
pub struct ControlLifecycle {
    props: ControlProps,
    has_errors: bool,
    validator: Arc<dyn Validator>,
}

impl ControlLifecycle {
    /// Add-more clones start without errors so untouched instances do not report
    /// mandatory failures.
    pub fn new(props: ControlProps, validator: Arc<dyn Validator>) -> Self {
        let mut lifecycle = Self {
            props,
            has_errors: false,
            validator,
        };
        if !lifecycle.props.form_field_path.is_repeat() {
            lifecycle.has_errors = !lifecycle.errors().is_empty();
        }
        lifecycle
    }

    pub fn props(&self) -> &ControlProps {
        &self.props
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn errors(&self) -> Vec<ControlError> {
        self.errors_for(self.props.value.as_ref())
    }

    pub fn errors_for(&self, value: Option<&ObsValue>) -> Vec<ControlError> {
        self.validator.get_errors(&ControlDetails {
            validations: &self.props.validations,
            value,
        })
    }

    /// Reports the initial state. Returns `true` if the parent was notified.
    pub fn mount(&self, host: &mut dyn ControlHost) -> bool {
        if !self.has_errors && self.props.value.is_none() {
            tracing::debug!("{} mounted without notification", self.props.form_field_path);
            return false;
        }
        host.on_change(self.props.value.as_ref(), &self.errors());
        true
    }

    /// Applies props from the parent. Returns `true` if the control updated.
    ///
    /// Errors are only recomputed when `next.validate` is set. The update is skipped when
    /// the enabled flag, the value and the error presence are all unchanged; otherwise the
    /// parent is re-notified if the new value has errors.
    pub fn receive_props(&mut self, next: ControlProps, host: &mut dyn ControlHost) -> bool {
        let has_errors = if next.validate {
            !self
                .validator
                .get_errors(&ControlDetails {
                    validations: &next.validations,
                    value: next.value.as_ref(),
                })
                .is_empty()
        } else {
            self.has_errors
        };

        let should_update = self.props.enabled != next.enabled
            || self.props.value != next.value
            || self.has_errors != has_errors;

        self.props = next;
        self.has_errors = has_errors;

        if !should_update {
            tracing::debug!("{} update suppressed", self.props.form_field_path);
            return false;
        }

        let errors = self.errors();
        if !errors.is_empty() {
            host.on_change(self.props.value.as_ref(), &errors);
        }
        true
    }

    /// Records a user edit and notifies the parent once.
    pub fn input(&mut self, value: Option<ObsValue>, host: &mut dyn ControlHost) {
        let errors = self.errors_for(value.as_ref());
        self.commit(value, errors, host);
    }

    /// Records a value with errors the widget computed itself and notifies the parent once.
    pub(crate) fn commit(
        &mut self,
        value: Option<ObsValue>,
        errors: Vec<ControlError>,
        host: &mut dyn ControlHost,
    ) {
        self.has_errors = !errors.is_empty();
        self.props.value = value;
        host.on_change(self.props.value.as_ref(), &errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::test_support::RecordingHost;
    use crate::form_namespace::FormFieldPath;
    use crate::validator::RuleValidator;
    use forms::Validation;

    fn props(path: &str) -> ControlProps {
        ControlProps::new(FormFieldPath::parse(path).expect("valid path"))
            .with_validations(vec![Validation::Mandatory])
    }

    fn lifecycle(props: ControlProps) -> ControlLifecycle {
        ControlLifecycle::new(props, Arc::new(RuleValidator))
    }

    #[test]
    fn original_instance_reports_initial_errors() {
        let control = lifecycle(props("form1.1/1-0"));
        let mut host = RecordingHost::default();

        assert!(control.has_errors());
        assert!(control.mount(&mut host));
        assert_eq!(
            host.changes,
            vec![(None, vec![ControlError::error(Validation::Mandatory)])]
        );
    }

    #[test]
    fn clone_suppresses_initial_errors() {
        let control = lifecycle(props("form1.1/1-1"));
        let mut host = RecordingHost::default();

        assert!(!control.has_errors());
        assert!(!control.mount(&mut host));
        assert!(host.changes.is_empty());
    }

    #[test]
    fn clone_with_value_still_notifies_on_mount() {
        let control = lifecycle(props("form1.1/1-2").with_value(Some("kept".into())));
        let mut host = RecordingHost::default();

        assert!(control.mount(&mut host));
        assert_eq!(host.changes, vec![(Some("kept".into()), vec![])]);
    }

    #[test]
    fn unchanged_props_are_suppressed() {
        let mut control = lifecycle(props("form1.1/1-0"));
        let mut host = RecordingHost::default();

        let next = control.props().clone().with_value(Some("x".into()));
        assert!(control.receive_props(next.clone(), &mut host));
        assert!(!control.receive_props(next, &mut host));
    }

    #[test]
    fn validate_flag_recomputes_errors_and_renotifies() {
        let mut control = lifecycle(props("form1.1/1-1"));
        let mut host = RecordingHost::default();

        let same_props = control.props().clone();
        assert!(!control.receive_props(same_props.clone(), &mut host));
        assert!(!control.has_errors());

        assert!(control.receive_props(same_props.with_validate(true), &mut host));
        assert!(control.has_errors());
        assert_eq!(
            host.changes,
            vec![(None, vec![ControlError::error(Validation::Mandatory)])]
        );
    }

    #[test]
    fn enabled_flip_updates_without_notifying_valid_value() {
        let mut control = lifecycle(props("form1.1/1-0").with_value(Some("ok".into())));
        let mut host = RecordingHost::default();

        let disabled = control.props().clone().with_enabled(false);
        assert!(control.receive_props(disabled, &mut host));
        assert!(host.changes.is_empty());
    }

    #[test]
    fn input_notifies_exactly_once() {
        let mut control = lifecycle(props("form1.1/1-0"));
        let mut host = RecordingHost::default();

        control.input(Some("42".into()), &mut host);

        assert!(!control.has_errors());
        assert_eq!(host.changes, vec![(Some("42".into()), vec![])]);
        assert_eq!(control.props().value, Some("42".into()));
    }
}
