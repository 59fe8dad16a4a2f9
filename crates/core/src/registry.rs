//! Widget registry.
//!
//! Hosts register widget factories under the keys form definitions use (`"text"`,
//! `"complex"`, ...) once at startup, then create widgets by key while mounting a form.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constants::{COMPLEX_CONTROL_KEY, NUMERIC_CONTROL_KEY, TEXT_CONTROL_KEY};
use crate::controls::{Control, ControlProps, Image, NumericBox, TextBox};
use crate::validator::Validator;
use crate::{FormError, FormResult};

pub type ControlFactory = fn(ControlProps, Arc<dyn Validator>) -> Box<dyn Control>;

#[derive(Clone, Default)]
pub struct ComponentStore {
    components: BTreeMap<String, ControlFactory>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `key`, returning the factory it replaced.
    pub fn register_component(
        &mut self,
        key: impl Into<String>,
        factory: ControlFactory,
    ) -> Option<ControlFactory> {
        let key = key.into();
        let replaced = self.components.insert(key.clone(), factory);
        if replaced.is_some() {
            tracing::warn!("control factory '{}' replaced", key);
        }
        replaced
    }

    pub fn get_registered_component(&self, key: &str) -> Option<ControlFactory> {
        self.components.get(key).copied()
    }

    /// Creates the widget registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UnknownControlType`] if nothing is registered under `key`.
    pub fn create(
        &self,
        key: &str,
        props: ControlProps,
        validator: Arc<dyn Validator>,
    ) -> FormResult<Box<dyn Control>> {
        let factory = self.get_registered_component(key).ok_or_else(|| {
            tracing::warn!("no control registered for '{}'", key);
            FormError::UnknownControlType(key.to_string())
        })?;
        Ok(factory(props, validator))
    }

    pub fn registered_keys(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }
}

/// Registers the built-in widgets.
pub fn register_default_controls(store: &mut ComponentStore) {
    store.register_component(TEXT_CONTROL_KEY, TextBox::create);
    store.register_component(NUMERIC_CONTROL_KEY, NumericBox::create);
    store.register_component(COMPLEX_CONTROL_KEY, Image::create);
}
