//! Observation group collection for repeatable ("add more") controls.
//!
//! An [`ObsList`] holds the template observation of a field plus the instances actually
//! present. Like [`Obs`], it is an immutable value replaced wholesale on each change.

use serde::{Deserialize, Serialize};

use crate::form_namespace::FormFieldPath;
use crate::obs::Obs;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObsList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    form_field_path: Option<FormFieldPath>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    form_namespace: Option<String>,

    obs: Obs,

    #[serde(default)]
    obs_list: Vec<Obs>,
}

impl ObsList {
    /// Creates a collection from its template observation, taking over its path and namespace.
    pub fn new(obs: Obs) -> Self {
        Self {
            form_field_path: obs.form_field_path().cloned(),
            form_namespace: obs.form_namespace().map(str::to_string),
            obs,
            obs_list: Vec::new(),
        }
    }

    /// Fresh collection for a new repeatable instance at `form_field_path`.
    ///
    /// The template is re-pathed, the namespace carried over and the instance list emptied.
    pub fn clone_for_add_more(&self, form_field_path: FormFieldPath) -> Self {
        Self {
            obs: self.obs.clone().set_form_field_path(form_field_path.clone()),
            form_namespace: self.form_namespace.clone(),
            obs_list: Vec::new(),
            form_field_path: Some(form_field_path),
        }
    }

    /// Voids every instance; the template and the path are untouched.
    #[must_use]
    pub fn void(self) -> Self {
        Self {
            obs_list: self.obs_list.into_iter().map(Obs::void).collect(),
            ..self
        }
    }

    #[must_use]
    pub fn set_obs_list(self, obs_list: Vec<Obs>) -> Self {
        Self { obs_list, ..self }
    }

    /// Replaces the instance occupying the same slot as `obs`, or appends it.
    #[must_use]
    pub fn add_obs(self, obs: Obs) -> Self {
        let mut obs_list = self.obs_list;
        match obs_list.iter().position(|existing| existing.same_slot(&obs)) {
            Some(index) => obs_list[index] = obs,
            None => obs_list.push(obs),
        }
        Self { obs_list, ..self }
    }

    pub fn obs(&self) -> &Obs {
        &self.obs
    }

    pub fn obs_list(&self) -> &[Obs] {
        &self.obs_list
    }

    pub fn form_field_path(&self) -> Option<&FormFieldPath> {
        self.form_field_path.as_ref()
    }

    pub fn form_namespace(&self) -> Option<&str> {
        self.form_namespace.as_deref()
    }
}
