use std::sync::Arc;

use super::{
    Control, ControlHost, ControlInput, ControlLifecycle, ControlProps, FileSelection,
    InputOutcome, Notification, PendingUpload,
};
use crate::constants::{COMPLEX_CONTROL_KEY, PDF_ICON_PATH, SUPPORTED_FILE_TYPES};
use crate::obs::ObsValue;
use crate::validator::{ControlError, Validator};

/// File upload widget. Its value is the URL of the uploaded file.
pub struct Image {
    lifecycle: ControlLifecycle,
    loading: bool,
    add_more_requested: bool,
    deleted_value: Option<ObsValue>,
}

impl Image {
    pub fn new(props: ControlProps, validator: Arc<dyn Validator>) -> Self {
        Self {
            lifecycle: ControlLifecycle::new(props, validator),
            loading: false,
            add_more_requested: false,
            deleted_value: None,
        }
    }

    /// Registry factory.
    pub fn create(props: ControlProps, validator: Arc<dyn Validator>) -> Box<dyn Control> {
        Box::new(Self::new(props, validator))
    }

    /// `true` for `application/pdf` and any `image/*` type.
    pub fn is_supported(media_type: &str) -> bool {
        SUPPORTED_FILE_TYPES
            .iter()
            .any(|supported| match supported.strip_suffix("/*") {
                Some(family) => media_type
                    .split_once('/')
                    .is_some_and(|(kind, subtype)| kind == family && !subtype.is_empty()),
                None => media_type == *supported,
            })
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// `true` between a delete and the next value.
    pub fn can_restore(&self) -> bool {
        self.deleted_value.is_some()
    }

    /// Source to preview: the PDF icon for PDF uploads, the file URL otherwise.
    pub fn display_source(&self) -> Option<&str> {
        let url = self.lifecycle.props().value.as_ref()?.as_text()?;
        if url.to_ascii_lowercase().ends_with(".pdf") {
            Some(PDF_ICON_PATH)
        } else {
            Some(url)
        }
    }

    /// Asks the parent for one more instance, once per widget.
    fn request_add_more(&mut self, host: &mut dyn ControlHost, notify: bool) {
        let props = self.lifecycle.props();
        if !props.add_more || self.add_more_requested {
            return;
        }
        self.add_more_requested = true;
        host.on_control_add(&props.form_field_path, notify);
    }

    fn select_file(
        &mut self,
        selection: Option<FileSelection>,
        host: &mut dyn ControlHost,
    ) -> InputOutcome {
        let Some(selection) = selection else {
            self.lifecycle.input(None, host);
            return InputOutcome::Handled;
        };

        if !Self::is_supported(&selection.media_type) {
            tracing::warn!(
                "rejected {} upload at {}",
                selection.media_type,
                self.lifecycle.props().form_field_path
            );
            host.show_notification(Notification::FileTypeNotSupported {
                media_type: selection.media_type,
            });
            return InputOutcome::Handled;
        }

        self.request_add_more(host, true);
        self.loading = true;
        InputOutcome::UploadRequested(PendingUpload::new(
            self.lifecycle.props().form_field_path.clone(),
            selection.data_url,
        ))
    }

    fn delete(&mut self, host: &mut dyn ControlHost) -> InputOutcome {
        let Some(value) = self.lifecycle.props().value.clone() else {
            return InputOutcome::Ignored;
        };
        // A deleted clone is only voided by the parent; it never reports errors.
        let errors = if self.lifecycle.props().form_field_path.is_repeat() {
            Vec::new()
        } else {
            self.lifecycle.errors_for(None)
        };
        self.deleted_value = Some(value);
        self.lifecycle.commit(None, errors, host);
        InputOutcome::Handled
    }

    fn restore(&mut self, host: &mut dyn ControlHost) -> InputOutcome {
        match self.deleted_value.take() {
            Some(value) => {
                self.lifecycle.input(Some(value), host);
                InputOutcome::Handled
            }
            None => InputOutcome::Ignored,
        }
    }
}

impl Control for Image {
    fn kind(&self) -> &'static str {
        COMPLEX_CONTROL_KEY
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
        if self.lifecycle.props().value.is_some() {
            self.request_add_more(host, false);
        }
    }

    fn receive_props(&mut self, next: ControlProps, host: &mut dyn ControlHost) -> bool {
        let updated = self.lifecycle.receive_props(next, host);
        if self.lifecycle.props().value.is_some() {
            self.deleted_value = None;
            self.request_add_more(host, false);
        }
        updated
    }

    fn handle_input(&mut self, input: ControlInput, host: &mut dyn ControlHost) -> InputOutcome {
        if !self.lifecycle.props().enabled || self.loading {
            return InputOutcome::Ignored;
        }
        match input {
            ControlInput::File(selection) => {
                self.deleted_value = None;
                self.select_file(selection, host)
            }
            ControlInput::Delete => self.delete(host),
            ControlInput::Restore => self.restore(host),
            ControlInput::Text(_) => {
                tracing::warn!(
                    "image control at {} ignores text input",
                    self.lifecycle.props().form_field_path
                );
                InputOutcome::Ignored
            }
        }
    }

    fn complete_upload(
        &mut self,
        pending: PendingUpload,
        result: Result<String, String>,
        host: &mut dyn ControlHost,
    ) {
        // The token is spent even when it is misrouted.
        self.loading = false;
        if pending.form_field_path() != &self.lifecycle.props().form_field_path {
            tracing::warn!(
                "upload for {} delivered to {}",
                pending.form_field_path(),
                self.lifecycle.props().form_field_path
            );
            return;
        }
        match result {
            Ok(url) => {
                tracing::info!("uploaded {} for {}", url, pending.form_field_path());
                self.lifecycle.input(Some(ObsValue::Text(url)), host);
            }
            Err(reason) => {
                tracing::warn!("upload for {} failed: {}", pending.form_field_path(), reason);
                host.show_notification(Notification::UploadFailed { reason });
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

    const PATH: &str = "test1.1/1-0";

    fn path(raw: &str) -> FormFieldPath {
        FormFieldPath::parse(raw).expect("valid path")
    }

    fn image_at(raw_path: &str, validations: Vec<Validation>) -> Image {
        let props = ControlProps::new(path(raw_path))
            .with_validations(validations)
            .with_add_more(true);
        Image::new(props, Arc::new(RuleValidator))
    }

    fn image() -> Image {
        image_at(PATH, vec![])
    }

    fn gif() -> FileSelection {
        FileSelection {
            media_type: "image/gif".into(),
            data_url: "data:image/gif;base64,R0lGODlhAQABAAAAACw=".into(),
        }
    }

    fn with_value(control: &Image, value: &str) -> ControlProps {
        control.props().clone().with_value(Some(value.into()))
    }

    #[test]
    fn supported_types() {
        assert!(Image::is_supported("application/pdf"));
        assert!(Image::is_supported("image/gif"));
        assert!(Image::is_supported("image/jpeg"));
        assert!(!Image::is_supported("random"));
        assert!(!Image::is_supported("image/"));
        assert!(!Image::is_supported("text/plain"));
    }

    #[test]
    fn upload_round_trip_notifies_url() {
        let mut control = image();
        let mut host = RecordingHost::default();

        let InputOutcome::UploadRequested(pending) =
            control.handle_input(ControlInput::File(Some(gif())), &mut host)
        else {
            panic!("expected an upload request");
        };
        assert_eq!(pending.data_url(), gif().data_url);
        assert!(control.is_loading());
        assert!(host.changes.is_empty());

        control.complete_upload(pending, Ok("someUrl".into()), &mut host);

        assert!(!control.is_loading());
        assert_eq!(host.changes, vec![(Some("someUrl".into()), vec![])]);
    }

    #[test]
    fn unsupported_file_only_shows_notification() {
        let mut control = image();
        let mut host = RecordingHost::default();

        let selection = FileSelection {
            media_type: "random".into(),
            data_url: "data:random;base64,AA==".into(),
        };
        let outcome = control.handle_input(ControlInput::File(Some(selection)), &mut host);

        assert_eq!(outcome, InputOutcome::Handled);
        assert_eq!(
            host.notifications,
            vec![Notification::FileTypeNotSupported {
                media_type: "random".into()
            }]
        );
        assert!(host.changes.is_empty());
        assert!(host.add_more.is_empty());
        assert!(!control.is_loading());
    }

    #[test]
    fn failed_upload_shows_notification_and_stops_loading() {
        let mut control = image();
        let mut host = RecordingHost::default();

        let InputOutcome::UploadRequested(pending) =
            control.handle_input(ControlInput::File(Some(gif())), &mut host)
        else {
            panic!("expected an upload request");
        };
        control.complete_upload(pending, Err("connection refused".into()), &mut host);

        assert!(!control.is_loading());
        assert!(host.changes.is_empty());
        assert_eq!(
            host.notifications,
            vec![Notification::UploadFailed {
                reason: "connection refused".into()
            }]
        );
    }

    #[test]
    fn upload_for_another_path_is_dropped_and_stops_loading() {
        let mut control = image();
        let mut host = RecordingHost::default();

        let InputOutcome::UploadRequested(_pending) =
            control.handle_input(ControlInput::File(Some(gif())), &mut host)
        else {
            panic!("expected an upload request");
        };
        let misrouted = PendingUpload::new(path("test1.1/9-0"), "data:image/gif;base64,AA==".into());
        control.complete_upload(misrouted, Ok("sha256/aa/bb/aabb".into()), &mut host);

        assert!(!control.is_loading());
        assert!(host.changes.is_empty());
        assert_eq!(control.props().value, None);
        assert!(matches!(
            control.handle_input(ControlInput::File(Some(gif())), &mut host),
            InputOutcome::UploadRequested(_)
        ));
    }

    #[test]
    fn input_is_ignored_while_uploading() {
        let mut control = image();
        let mut host = RecordingHost::default();

        let _pending = control.handle_input(ControlInput::File(Some(gif())), &mut host);

        assert_eq!(
            control.handle_input(ControlInput::File(Some(gif())), &mut host),
            InputOutcome::Ignored
        );
    }

    #[test]
    fn pdf_values_display_the_pdf_icon() {
        let mut control = image();
        let mut host = RecordingHost::default();

        control.receive_props(with_value(&control, "someValue"), &mut host);
        assert_eq!(control.display_source(), Some("someValue"));

        control.receive_props(with_value(&control, "someValue.pdf"), &mut host);
        assert_eq!(control.display_source(), Some(PDF_ICON_PATH));
    }

    #[test]
    fn value_from_props_requests_add_more_once_without_notification() {
        let mut control = image();
        let mut host = RecordingHost::default();

        control.receive_props(with_value(&control, "someValue"), &mut host);
        control.receive_props(with_value(&control, "newValue"), &mut host);

        assert_eq!(host.add_more, vec![(path(PATH), false)]);
    }

    #[test]
    fn file_selection_requests_add_more_with_notification() {
        let mut control = image();
        let mut host = RecordingHost::default();

        let InputOutcome::UploadRequested(pending) =
            control.handle_input(ControlInput::File(Some(gif())), &mut host)
        else {
            panic!("expected an upload request");
        };
        control.complete_upload(pending, Ok("someUrl".into()), &mut host);
        control.receive_props(with_value(&control, "someUrl"), &mut host);

        assert_eq!(host.add_more, vec![(path(PATH), true)]);
    }

    #[test]
    fn no_add_more_without_value_or_property() {
        let mut control = image();
        let mut host = RecordingHost::default();

        control.receive_props(control.props().clone().with_value(None), &mut host);
        let no_add_more = control
            .props()
            .clone()
            .with_add_more(false)
            .with_value(Some("someValue".into()));
        let mut fixed = Image::new(no_add_more.clone(), Arc::new(RuleValidator));
        fixed.mount(&mut host);
        fixed.receive_props(no_add_more, &mut host);

        assert!(host.add_more.is_empty());
    }

    #[test]
    fn mounting_with_value_requests_add_more() {
        let props = ControlProps::new(path(PATH))
            .with_add_more(true)
            .with_value(Some("someValue".into()));
        let mut control = Image::new(props, Arc::new(RuleValidator));
        let mut host = RecordingHost::default();

        control.mount(&mut host);
        control.receive_props(with_value(&control, "someValue"), &mut host);

        assert_eq!(host.add_more, vec![(path(PATH), false)]);
        assert_eq!(host.changes, vec![(Some("someValue".into()), vec![])]);
    }

    #[test]
    fn delete_then_restore() {
        let mut control = image_at(PATH, vec![Validation::Mandatory]);
        let mut host = RecordingHost::default();
        control.receive_props(with_value(&control, "someValue"), &mut host);

        assert_eq!(
            control.handle_input(ControlInput::Delete, &mut host),
            InputOutcome::Handled
        );
        assert!(control.can_restore());
        assert_eq!(
            control.handle_input(ControlInput::Restore, &mut host),
            InputOutcome::Handled
        );
        assert!(!control.can_restore());

        assert_eq!(
            host.changes,
            vec![
                (None, vec![ControlError::error(Validation::Mandatory)]),
                (Some("someValue".into()), vec![]),
            ]
        );
    }

    #[test]
    fn deleting_a_clone_reports_no_errors() {
        let mut control = image_at("test1.1/1-1", vec![Validation::Mandatory]);
        let mut host = RecordingHost::default();
        control.receive_props(with_value(&control, "someValue"), &mut host);

        control.handle_input(ControlInput::Delete, &mut host);

        assert_eq!(host.changes, vec![(None, vec![])]);
    }

    #[test]
    fn cleared_selection_validates_absent_value() {
        let mut control = image_at(PATH, vec![Validation::Mandatory]);
        let mut host = RecordingHost::default();

        control.handle_input(ControlInput::File(None), &mut host);

        assert!(control.has_errors());
        assert_eq!(
            host.changes,
            vec![(None, vec![ControlError::error(Validation::Mandatory)])]
        );
    }

    #[test]
    fn validate_on_update_renotifies_errors() {
        let mut control = image_at(PATH, vec![Validation::Mandatory]);
        let mut host = RecordingHost::default();
        control.receive_props(with_value(&control, "someValue"), &mut host);

        let next = control.props().clone().with_value(None).with_validate(true);
        assert!(control.receive_props(next, &mut host));

        assert_eq!(
            host.changes,
            vec![(None, vec![ControlError::error(Validation::Mandatory)])]
        );
    }

    #[test]
    fn unchanged_value_does_not_notify() {
        let mut control = image();
        let mut host = RecordingHost::default();

        control.receive_props(with_value(&control, "someValue"), &mut host);
        assert!(!control.receive_props(with_value(&control, "someValue"), &mut host));
        assert!(host.changes.is_empty());
    }
}
