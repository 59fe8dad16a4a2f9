//! Binding of one widget to one observation.
//!
//! [`ObsControl`] owns the widget and the observation it edits. Every change the widget
//! reports is applied to the observation (an absent value voids it, a defined value goes
//! through [`Obs::set_value`]) and the accepted value is handed back to the widget as props.

use crate::controls::{
    Control, ControlHost, ControlInput, InputOutcome, Notification, PendingUpload,
};
use crate::form_namespace::FormFieldPath;
use crate::obs::{Obs, ObsValue};
use crate::validator::ControlError;

/// Something a control asked of its owner.
#[derive(Clone, Debug, PartialEq)]
pub enum ObsEvent {
    Changed {
        form_field_path: FormFieldPath,
        value: Option<ObsValue>,
        errors: Vec<ControlError>,
    },
    AddMore {
        form_field_path: FormFieldPath,
        notify: bool,
    },
    Notification {
        form_field_path: FormFieldPath,
        notification: Notification,
    },
}

/// The observation side of an [`ObsControl`]; this is the widget's host.
struct ObsSlot {
    form_field_path: FormFieldPath,
    obs: Obs,
    errors: Vec<ControlError>,
    events: Vec<ObsEvent>,
}

impl ControlHost for ObsSlot {
    fn on_change(&mut self, value: Option<&ObsValue>, errors: &[ControlError]) {
        let obs = std::mem::take(&mut self.obs);
        self.obs = match value {
            Some(value) => obs.set_value(Some(value.clone())),
            None => obs.void(),
        };
        self.errors = errors.to_vec();
        self.events.push(ObsEvent::Changed {
            form_field_path: self.form_field_path.clone(),
            value: value.cloned(),
            errors: self.errors.clone(),
        });
    }

    fn on_control_add(&mut self, form_field_path: &FormFieldPath, notify: bool) {
        self.events.push(ObsEvent::AddMore {
            form_field_path: form_field_path.clone(),
            notify,
        });
    }

    fn show_notification(&mut self, notification: Notification) {
        self.events.push(ObsEvent::Notification {
            form_field_path: self.form_field_path.clone(),
            notification,
        });
    }
}

pub struct ObsControl {
    control: Box<dyn Control>,
    slot: ObsSlot,
}

impl ObsControl {
    /// Binds `control` to `obs`. The widget's props should already carry the value of `obs`.
    pub fn new(control: Box<dyn Control>, obs: Obs) -> Self {
        let form_field_path = control.props().form_field_path.clone();
        Self {
            control,
            slot: ObsSlot {
                form_field_path,
                obs,
                errors: Vec::new(),
                events: Vec::new(),
            },
        }
    }

    pub fn form_field_path(&self) -> &FormFieldPath {
        &self.slot.form_field_path
    }

    pub fn control(&self) -> &dyn Control {
        self.control.as_ref()
    }

    pub fn obs(&self) -> &Obs {
        &self.slot.obs
    }

    /// Errors of the last change the widget reported.
    pub fn errors(&self) -> &[ControlError] {
        &self.slot.errors
    }

    pub fn mount(&mut self) {
        self.control.mount(&mut self.slot);
        self.sync();
    }

    pub fn input(&mut self, input: ControlInput) -> InputOutcome {
        let outcome = self.control.handle_input(input, &mut self.slot);
        self.sync();
        outcome
    }

    pub fn complete_upload(&mut self, pending: PendingUpload, result: Result<String, String>) {
        self.control.complete_upload(pending, result, &mut self.slot);
        self.sync();
    }

    /// Re-validates the current value and returns its errors.
    pub fn validate(&mut self) -> Vec<ControlError> {
        let next = self.control.props().clone().with_validate(true);
        self.control.receive_props(next, &mut self.slot);
        let errors = self.control.errors();
        self.slot.errors = errors.clone();
        errors
    }

    /// Voids the observation and clears the widget.
    pub fn void(&mut self) {
        self.slot.obs = std::mem::take(&mut self.slot.obs).void();
        self.sync();
    }

    /// Drains the requests collected since the last call.
    pub fn take_events(&mut self) -> Vec<ObsEvent> {
        std::mem::take(&mut self.slot.events)
    }

    /// Hands the observation's value back to the widget.
    fn sync(&mut self) {
        let value = self.slot.obs.value().cloned();
        if self.control.props().value == value {
            return;
        }
        let next = self.control.props().clone().with_value(value);
        self.control.receive_props(next, &mut self.slot);
    }
}
