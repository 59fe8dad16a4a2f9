//! Form-field paths and the observation resolver.
//!
//! Every control instance owns one observation slot, identified by its form-field path:
//!
//! `<formName>.<formVersion>/<controlId>-<repeatIndex>`
//!
//! Example: `Vitals.1/3-0` is the original instance of control `3` of version 1 of the
//! `Vitals` form, and `Vitals.1/3-2` is its second "add more" clone.
//!
//! The repeat index is parsed once when a path is constructed. Whether an instance is a
//! clone is read from that field and never re-derived from the string.
//!
//! On (re)render a control is bound to the first known observation whose path equals the
//! control's path. When none matches, a voided, valueless observation is synthesized from
//! the control's metadata.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::ORIGINAL_REPEAT_INDEX;
use crate::obs::Obs;
use crate::{FormError, FormResult};
use forms::{ControlDefinition, FormName};

/// Identity path of a control instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormFieldPath {
    prefix: String,
    control_id: String,
    repeat_index: u32,
}

impl FormFieldPath {
    /// Builds the path of a control instance from its form coordinates.
    pub fn new(
        form_name: &FormName,
        form_version: &str,
        control_id: &str,
        repeat_index: u32,
    ) -> Self {
        Self {
            prefix: format!("{}.{}", form_name, form_version),
            control_id: control_id.to_string(),
            repeat_index,
        }
    }

    /// Parses a path such as `Vitals.1/3-0`.
    ///
    /// The last `/` separates the form prefix from the control segment; the last `-` of that
    /// segment separates the control id from the repeat index.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidFormFieldPath`] if a separator is missing, a component is
    /// empty or the repeat index is not written as canonical decimal digits (no sign, no
    /// leading zero).
    pub fn parse(raw: &str) -> FormResult<Self> {
        let invalid = || FormError::InvalidFormFieldPath(raw.to_string());

        let (prefix, segment) = raw.rsplit_once('/').ok_or_else(invalid)?;
        let (control_id, repeat) = segment.rsplit_once('-').ok_or_else(invalid)?;
        if !is_canonical_index(repeat) {
            return Err(invalid());
        }
        let repeat_index = repeat.parse::<u32>().map_err(|_| invalid())?;

        if prefix.is_empty() || control_id.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            prefix: prefix.to_string(),
            control_id: control_id.to_string(),
            repeat_index,
        })
    }

    /// `<formName>.<formVersion>` part of the path.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn control_id(&self) -> &str {
        &self.control_id
    }

    pub fn repeat_index(&self) -> u32 {
        self.repeat_index
    }

    /// Returns `true` for "add more" clones, `false` for the original instance.
    pub fn is_repeat(&self) -> bool {
        self.repeat_index != ORIGINAL_REPEAT_INDEX
    }

    /// Returns `true` if both paths belong to instances of the same control.
    pub fn same_control(&self, other: &FormFieldPath) -> bool {
        self.prefix == other.prefix && self.control_id == other.control_id
    }

    pub fn with_repeat_index(&self, repeat_index: u32) -> Self {
        Self {
            repeat_index,
            ..self.clone()
        }
    }

    /// Path for the next "add more" clone: one past the largest repeat index among `self`
    /// and the `existing` instances of the same control.
    pub fn next_repeat<'a>(&self, existing: impl IntoIterator<Item = &'a FormFieldPath>) -> Self {
        let highest = existing
            .into_iter()
            .filter(|path| path.same_control(self))
            .map(FormFieldPath::repeat_index)
            .fold(self.repeat_index, u32::max);
        self.with_repeat_index(highest.saturating_add(1))
    }
}

/// `0`, or digits without a leading zero. Anything else would not render back verbatim.
fn is_canonical_index(repeat: &str) -> bool {
    match repeat.as_bytes() {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        digits => digits.iter().all(u8::is_ascii_digit),
    }
}

impl fmt::Display for FormFieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.prefix, self.control_id, self.repeat_index)
    }
}

impl std::str::FromStr for FormFieldPath {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormFieldPath::parse(s)
    }
}

impl Serialize for FormFieldPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FormFieldPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Namespace and path assigned to a control instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormNamespaceAndPath {
    pub form_namespace: String,
    pub form_field_path: FormFieldPath,
}

/// Derives the namespace and the original-instance path of a control.
pub fn create_form_namespace_and_path(
    form_name: &FormName,
    form_version: &str,
    control_id: &str,
    form_namespace: &str,
) -> FormNamespaceAndPath {
    FormNamespaceAndPath {
        form_namespace: form_namespace.to_string(),
        form_field_path: FormFieldPath::new(
            form_name,
            form_version,
            control_id,
            ORIGINAL_REPEAT_INDEX,
        ),
    }
}

/// Synthesizes a voided, valueless observation for a control that has no prior observation.
pub fn obs_from_metadata(
    form_namespace_and_path: &FormNamespaceAndPath,
    control: &ControlDefinition,
) -> Obs {
    let concept = control.concept.clone().unwrap_or_else(|| {
        tracing::warn!("control '{}' has no concept metadata", control.id);
        Default::default()
    });

    Obs::new(concept)
        .with_form_namespace(form_namespace_and_path.form_namespace.clone())
        .with_form_field_path(form_namespace_and_path.form_field_path.clone())
        .with_voided(true)
}

/// Binds a control to its observation.
///
/// Scans `observations` for the first one whose path equals the control's path and returns a
/// full copy of it; otherwise returns [`obs_from_metadata`].
pub fn create_obs_from_control(
    form_name: &FormName,
    form_version: &str,
    control: &ControlDefinition,
    observations: &[Obs],
    form_namespace: &str,
) -> Obs {
    let namespace_and_path =
        create_form_namespace_and_path(form_name, form_version, &control.id, form_namespace);

    match observations
        .iter()
        .find(|obs| obs.form_field_path() == Some(&namespace_and_path.form_field_path))
    {
        Some(existing) => {
            tracing::debug!(
                "bound {} to existing observation",
                namespace_and_path.form_field_path
            );
            existing.clone()
        }
        None => obs_from_metadata(&namespace_and_path, control),
    }
}
