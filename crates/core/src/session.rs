//! A mounted form.
//!
//! [`FormSession`] mounts every observation control of a [`FormDefinition`] over the
//! observations recorded so far and owns the resulting [`ObsControl`]s. Hosts route user
//! input, uploads and save-time validation through the session by form-field path and read
//! the observation tree back with [`FormSession::observations`].
//!
//! Repeatable controls keep their instances in an [`ObsList`] per control id. New
//! instances are appended when a widget asks for one (file widgets do so once they hold a
//! value) or when the host calls [`FormSession::add_instance`].

use std::collections::BTreeMap;
use std::sync::Arc;

use forms::{ControlDefinition, FormDefinition};

use crate::config::CoreConfig;
use crate::constants::ORIGINAL_REPEAT_INDEX;
use crate::controls::{
    ControlInput, ControlProps, FileSelection, InputOutcome, Notification, PendingUpload,
};
use crate::form_namespace::{
    create_form_namespace_and_path, create_obs_from_control, obs_from_metadata, FormFieldPath,
};
use crate::obs::Obs;
use crate::obs_control::{ObsControl, ObsEvent};
use crate::obs_list::ObsList;
use crate::registry::ComponentStore;
use crate::upload::FileUploader;
use crate::validator::{ControlError, Validator};
use crate::{FormError, FormResult};

pub struct FormSession {
    form: FormDefinition,
    form_namespace: String,
    components: ComponentStore,
    validator: Arc<dyn Validator>,
    controls: Vec<ObsControl>,
    obs_lists: BTreeMap<String, ObsList>,
    removed: Vec<Obs>,
    notifications: Vec<(FormFieldPath, Notification)>,
}

impl FormSession {
    /// Mounts `form` over `observations`.
    ///
    /// Each observation control is bound to the observation recorded at its path, or to a
    /// voided placeholder. Previously recorded add-more instances are mounted as well.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::MissingWidgetType`] for an observation control without a
    /// concept datatype. Controls whose datatype has no registered widget are skipped.
    pub fn mount(
        form: FormDefinition,
        observations: &[Obs],
        components: &ComponentStore,
        validator: Arc<dyn Validator>,
        config: &CoreConfig,
    ) -> FormResult<Self> {
        let mut session = Self {
            form,
            form_namespace: config.form_namespace().to_string(),
            components: components.clone(),
            validator,
            controls: Vec::new(),
            obs_lists: BTreeMap::new(),
            removed: Vec::new(),
            notifications: Vec::new(),
        };

        for definition in session.form.controls.clone() {
            if !definition.is_obs_control() {
                tracing::debug!(
                    "skipping {} control '{}'",
                    definition.control_type,
                    definition.id
                );
                continue;
            }
            session.mount_control(&definition, observations)?;
        }

        // Add-more requests raised while mounting are resolved once every recorded
        // instance is in place.
        session.process_all_events()?;

        tracing::info!(
            "mounted form {}.{} with {} control instances",
            session.form.name,
            session.form.version,
            session.controls.len()
        );
        Ok(session)
    }

    fn mount_control(
        &mut self,
        definition: &ControlDefinition,
        observations: &[Obs],
    ) -> FormResult<()> {
        let key = definition
            .widget_key()
            .ok_or_else(|| FormError::MissingWidgetType(definition.id.clone()))?;
        if self.components.get_registered_component(&key).is_none() {
            tracing::warn!(
                "no widget registered for '{}', skipping control '{}'",
                key,
                definition.id
            );
            return Ok(());
        }

        let obs = create_obs_from_control(
            &self.form.name,
            &self.form.version,
            definition,
            observations,
            &self.form_namespace,
        );
        let original_index = self.mount_instance(definition, obs)?;

        if !definition.properties.add_more {
            return Ok(());
        }

        let namespace_and_path = create_form_namespace_and_path(
            &self.form.name,
            &self.form.version,
            &definition.id,
            &self.form_namespace,
        );
        let original_path = namespace_and_path.form_field_path.clone();

        let mut clones: Vec<&Obs> = observations
            .iter()
            .filter(|obs| {
                obs.form_field_path()
                    .is_some_and(|path| path.same_control(&original_path) && path.is_repeat())
            })
            .collect();
        clones.sort_by_key(|obs| obs.form_field_path().map(FormFieldPath::repeat_index));
        clones.dedup_by(|a, b| a.form_field_path() == b.form_field_path());

        let mut list = ObsList::new(obs_from_metadata(&namespace_and_path, definition))
            .add_obs(self.controls[original_index].obs().clone());
        for clone in clones {
            list = list.add_obs(clone.clone());
            self.mount_instance(definition, clone.clone())?;
        }
        self.obs_lists.insert(definition.id.clone(), list);
        Ok(())
    }

    /// Creates, mounts and stores the widget for one instance. Returns its index.
    fn mount_instance(&mut self, definition: &ControlDefinition, obs: Obs) -> FormResult<usize> {
        let form_field_path = match obs.form_field_path() {
            Some(path) => path.clone(),
            None => {
                return Err(FormError::InvalidFormFieldPath(format!(
                    "observation for control '{}' has no form field path",
                    definition.id
                )))
            }
        };
        let key = definition
            .widget_key()
            .ok_or_else(|| FormError::MissingWidgetType(definition.id.clone()))?;

        let props = ControlProps::new(form_field_path.clone())
            .with_value(obs.value().cloned())
            .with_validations(definition.validations())
            .with_add_more(definition.properties.add_more);
        let widget = self.components.create(&key, props, self.validator.clone())?;

        let mut control = ObsControl::new(widget, obs);
        control.mount();

        // Instances of one control stay together, ordered by repeat index.
        let index = self
            .controls
            .iter()
            .rposition(|existing| existing.form_field_path().same_control(&form_field_path))
            .map_or(self.controls.len(), |last| last + 1);
        self.controls.insert(index, control);
        tracing::debug!("mounted {} control at {}", key, form_field_path);
        Ok(index)
    }

    /// Appends a new, empty instance of the repeatable control `control_id`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UnknownControlPath`] if the form has no such control and
    /// [`FormError::NotRepeatable`] if the control cannot be repeated.
    pub fn add_instance(&mut self, control_id: &str) -> FormResult<FormFieldPath> {
        let definition = self
            .form
            .control(control_id)
            .cloned()
            .ok_or_else(|| FormError::UnknownControlPath(control_id.to_string()))?;
        let list = self
            .obs_lists
            .get(control_id)
            .ok_or_else(|| FormError::NotRepeatable(control_id.to_string()))?;

        let original = FormFieldPath::new(
            &self.form.name,
            &self.form.version,
            control_id,
            ORIGINAL_REPEAT_INDEX,
        );
        let next = original.next_repeat(
            self.controls
                .iter()
                .map(ObsControl::form_field_path)
                .chain(self.removed.iter().filter_map(Obs::form_field_path)),
        );

        let template = list.clone_for_add_more(next.clone()).obs().clone();
        let index = self.mount_instance(&definition, template.clone())?;
        if let Some(list) = self.obs_lists.get_mut(control_id) {
            *list = std::mem::take(list).add_obs(template);
        }
        tracing::debug!("added instance {}", next);
        self.process_events(index)?;
        Ok(next)
    }

    /// Removes an add-more instance. A recorded observation is kept as voided.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::OriginalInstanceNotRemovable`] for the original instance and
    /// [`FormError::UnknownControlPath`] if nothing is mounted at `form_field_path`.
    pub fn remove_instance(&mut self, form_field_path: &FormFieldPath) -> FormResult<()> {
        if !form_field_path.is_repeat() {
            return Err(FormError::OriginalInstanceNotRemovable(
                form_field_path.to_string(),
            ));
        }
        let index = self.index_of(form_field_path)?;
        let voided = self.controls.remove(index).obs().clone().void();

        if let Some(list) = self.obs_lists.get_mut(form_field_path.control_id()) {
            let remaining = list
                .obs_list()
                .iter()
                .filter(|obs| obs.form_field_path() != Some(form_field_path))
                .cloned()
                .collect();
            *list = std::mem::take(list).set_obs_list(remaining);
        }
        self.removed.push(voided);
        tracing::debug!("removed instance {}", form_field_path);
        Ok(())
    }

    /// Voids every instance of `control_id`.
    pub fn void_group(&mut self, control_id: &str) -> FormResult<()> {
        let mut found = false;
        for control in &mut self.controls {
            if control.form_field_path().control_id() == control_id {
                control.void();
                found = true;
            }
        }
        if !found {
            return Err(FormError::UnknownControlPath(control_id.to_string()));
        }
        if let Some(list) = self.obs_lists.get_mut(control_id) {
            *list = std::mem::take(list).void();
        }
        self.process_all_events()
    }

    /// Routes a user interaction to the control at `form_field_path`.
    pub fn input(
        &mut self,
        form_field_path: &FormFieldPath,
        input: ControlInput,
    ) -> FormResult<InputOutcome> {
        let index = self.index_of(form_field_path)?;
        let outcome = self.controls[index].input(input);
        self.process_events(index)?;
        Ok(outcome)
    }

    /// Resumes the control that requested `pending`.
    pub fn complete_upload(
        &mut self,
        pending: PendingUpload,
        result: Result<String, String>,
    ) -> FormResult<()> {
        let index = self.index_of(pending.form_field_path())?;
        self.controls[index].complete_upload(pending, result);
        self.process_events(index)
    }

    /// Selects a file and performs the upload it triggers with `uploader`.
    ///
    /// Upload failures are reported to the user as a notification, not as an error.
    pub fn upload_with(
        &mut self,
        form_field_path: &FormFieldPath,
        selection: FileSelection,
        uploader: &dyn FileUploader,
    ) -> FormResult<InputOutcome> {
        match self.input(form_field_path, ControlInput::File(Some(selection)))? {
            InputOutcome::UploadRequested(pending) => {
                let result = uploader
                    .upload_file(pending.data_url())
                    .map_err(|err| err.to_string());
                self.complete_upload(pending, result)?;
                Ok(InputOutcome::Handled)
            }
            outcome => Ok(outcome),
        }
    }

    /// Save-time validation. Returns the errors of every control that has any.
    ///
    /// Add-more instances the user never filled in are skipped.
    pub fn validate(&mut self) -> FormResult<Vec<(FormFieldPath, Vec<ControlError>)>> {
        let mut failures = Vec::new();
        for form_field_path in self.mounted_paths() {
            let index = self.index_of(&form_field_path)?;
            if is_untouched_clone(self.controls[index].obs()) {
                continue;
            }
            let errors = self.controls[index].validate();
            self.process_events(index)?;
            if !errors.is_empty() {
                failures.push((form_field_path, errors));
            }
        }
        Ok(failures)
    }

    /// The observation tree to persist.
    ///
    /// Voided observations that were never recorded are left out.
    pub fn observations(&self) -> Vec<Obs> {
        self.controls
            .iter()
            .map(ObsControl::obs)
            .chain(self.removed.iter())
            .filter(|obs| !(obs.is_voided() && obs.uuid().is_none()))
            .cloned()
            .collect()
    }

    /// Errors of the last change each control reported.
    pub fn errors(&self) -> Vec<(&FormFieldPath, &[ControlError])> {
        self.controls
            .iter()
            .filter(|control| !control.errors().is_empty())
            .map(|control| (control.form_field_path(), control.errors()))
            .collect()
    }

    pub fn notifications(&self) -> &[(FormFieldPath, Notification)] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<(FormFieldPath, Notification)> {
        std::mem::take(&mut self.notifications)
    }

    pub fn obs_list(&self, control_id: &str) -> Option<&ObsList> {
        self.obs_lists.get(control_id)
    }

    pub fn control(&self, form_field_path: &FormFieldPath) -> Option<&ObsControl> {
        self.controls
            .iter()
            .find(|control| control.form_field_path() == form_field_path)
    }

    pub fn form_field_paths(&self) -> Vec<&FormFieldPath> {
        self.controls.iter().map(ObsControl::form_field_path).collect()
    }

    pub fn form(&self) -> &FormDefinition {
        &self.form
    }

    fn index_of(&self, form_field_path: &FormFieldPath) -> FormResult<usize> {
        self.controls
            .iter()
            .position(|control| control.form_field_path() == form_field_path)
            .ok_or_else(|| FormError::UnknownControlPath(form_field_path.to_string()))
    }

    fn mounted_paths(&self) -> Vec<FormFieldPath> {
        self.controls
            .iter()
            .map(|control| control.form_field_path().clone())
            .collect()
    }

    /// Handles pending events of every control. Instances added on the way are processed
    /// by [`FormSession::add_instance`] itself.
    fn process_all_events(&mut self) -> FormResult<()> {
        for form_field_path in self.mounted_paths() {
            if let Ok(index) = self.index_of(&form_field_path) {
                self.process_events(index)?;
            }
        }
        Ok(())
    }

    fn is_last_instance(&self, form_field_path: &FormFieldPath) -> bool {
        !self.controls.iter().any(|control| {
            let path = control.form_field_path();
            path.same_control(form_field_path)
                && path.repeat_index() > form_field_path.repeat_index()
        })
    }

    fn process_events(&mut self, index: usize) -> FormResult<()> {
        let Some(control) = self.controls.get_mut(index) else {
            return Ok(());
        };
        let events = control.take_events();
        let obs = control.obs().clone();

        for event in events {
            match event {
                ObsEvent::Changed {
                    form_field_path, ..
                } => {
                    if let Some(list) = self.obs_lists.get_mut(form_field_path.control_id()) {
                        *list = std::mem::take(list).add_obs(obs.clone());
                    }
                }
                ObsEvent::AddMore {
                    form_field_path,
                    notify,
                } => {
                    if !self.is_last_instance(&form_field_path) {
                        tracing::debug!("{} already has a following instance", form_field_path);
                        continue;
                    }
                    let added = self.add_instance(form_field_path.control_id())?;
                    if notify {
                        tracing::info!("added {} after upload at {}", added, form_field_path);
                    }
                }
                ObsEvent::Notification {
                    form_field_path,
                    notification,
                } => {
                    tracing::warn!("{}: {}", form_field_path, notification);
                    self.notifications.push((form_field_path, notification));
                }
            }
        }
        Ok(())
    }
}

fn is_untouched_clone(obs: &Obs) -> bool {
    obs.form_field_path().is_some_and(FormFieldPath::is_repeat)
        && obs.value().is_none()
        && obs.uuid().is_none()
}
