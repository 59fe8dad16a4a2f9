//! Widget contract.
//!
//! Every widget binds one control instance to one observation value and follows the same
//! lifecycle (see [`ControlLifecycle`]): validate on mount, re-validate on request, skip
//! updates that change nothing visible, re-notify on post-update errors and notify exactly
//! once per user edit.
//!
//! Widgets talk to their parent through [`ControlHost`]. The parent owns the value: a widget
//! reports a candidate value and the parent hands the accepted value back through
//! [`Control::receive_props`].

mod image;
mod lifecycle;
mod numeric_box;
mod text_box;

pub use image::Image;
pub use lifecycle::ControlLifecycle;
pub use numeric_box::NumericBox;
pub use text_box::TextBox;

use std::fmt;

use crate::form_namespace::FormFieldPath;
use crate::obs::ObsValue;
use crate::validator::{ControlError, ErrorKind};
use forms::Validation;

/// Inputs a parent passes to a widget.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlProps {
    pub form_field_path: FormFieldPath,
    pub value: Option<ObsValue>,
    pub validations: Vec<Validation>,
    pub enabled: bool,
    /// Set by the parent to request re-validation (for example on save).
    pub validate: bool,
    /// The control may be repeated by the user.
    pub add_more: bool,
}

impl ControlProps {
    pub fn new(form_field_path: FormFieldPath) -> Self {
        Self {
            form_field_path,
            value: None,
            validations: Vec::new(),
            enabled: true,
            validate: false,
            add_more: false,
        }
    }

    pub fn with_value(mut self, value: Option<ObsValue>) -> Self {
        self.value = value;
        self
    }

    pub fn with_validations(mut self, validations: Vec<Validation>) -> Self {
        self.validations = validations;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_add_more(mut self, add_more: bool) -> Self {
        self.add_more = add_more;
        self
    }
}

/// User-facing messages a widget asks its host to display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    FileTypeNotSupported { media_type: String },
    UploadFailed { reason: String },
}

impl Notification {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Notification::FileTypeNotSupported { .. } | Notification::UploadFailed { .. } => {
                ErrorKind::Error
            }
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::FileTypeNotSupported { media_type } => {
                write!(f, "file type not supported: {media_type}")
            }
            Notification::UploadFailed { reason } => write!(f, "upload failed: {reason}"),
        }
    }
}

/// The parent of a widget.
pub trait ControlHost {
    /// Receives the widget's candidate value and its validation errors.
    fn on_change(&mut self, value: Option<&ObsValue>, errors: &[ControlError]);

    /// Asks the parent to add another instance of a repeatable control.
    fn on_control_add(&mut self, _form_field_path: &FormFieldPath, _notify: bool) {}

    fn show_notification(&mut self, _notification: Notification) {}
}

/// A file picked by the user, as read by the browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSelection {
    pub media_type: String,
    /// `data:<mime>;base64,<payload>`
    pub data_url: String,
}

/// A user interaction.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlInput {
    /// Raw text typed into the control.
    Text(String),
    /// A file selection; `None` when the picker was cleared.
    File(Option<FileSelection>),
    /// Remove the current value.
    Delete,
    /// Bring back the value removed by the last `Delete`.
    Restore,
}

/// An upload the widget is waiting for.
///
/// The token is consumed by [`Control::complete_upload`], so each upload resumes the widget
/// exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "the widget stays in its loading state until the upload is completed"]
pub struct PendingUpload {
    form_field_path: FormFieldPath,
    data_url: String,
}

impl PendingUpload {
    pub(crate) fn new(form_field_path: FormFieldPath, data_url: String) -> Self {
        Self {
            form_field_path,
            data_url,
        }
    }

    pub fn form_field_path(&self) -> &FormFieldPath {
        &self.form_field_path
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

/// What a widget did with an input.
#[derive(Debug, PartialEq)]
pub enum InputOutcome {
    Handled,
    /// The widget does not accept this input in its current state.
    Ignored,
    UploadRequested(PendingUpload),
}

/// A widget.
pub trait Control {
    /// Registry key the widget was registered under.
    fn kind(&self) -> &'static str;

    fn props(&self) -> &ControlProps;

    fn has_errors(&self) -> bool;

    /// Current errors for the current value.
    fn errors(&self) -> Vec<ControlError>;

    fn mount(&mut self, host: &mut dyn ControlHost);

    /// Applies new props from the parent. Returns `true` if the widget updated.
    fn receive_props(&mut self, next: ControlProps, host: &mut dyn ControlHost) -> bool;

    fn handle_input(&mut self, input: ControlInput, host: &mut dyn ControlHost) -> InputOutcome;

    /// Resumes the widget after an upload it requested.
    fn complete_upload(
        &mut self,
        pending: PendingUpload,
        _result: Result<String, String>,
        _host: &mut dyn ControlHost,
    ) {
        tracing::warn!(
            "{} control at {} did not request an upload",
            self.kind(),
            pending.form_field_path()
        );
    }
}
