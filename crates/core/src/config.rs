//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at host startup and then
//! passed into the form session. The library never reads process environment variables
//! itself; hosts pass the raw values in.

use crate::constants::{DEFAULT_FORM_NAMESPACE, DEFAULT_UPLOAD_DIR};
use crate::{FormError, FormResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    form_namespace: String,
    upload_dir: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            form_namespace: DEFAULT_FORM_NAMESPACE.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(form_namespace: String, upload_dir: PathBuf) -> FormResult<Self> {
        let form_namespace = form_namespace.trim().to_string();
        if form_namespace.is_empty() {
            return Err(FormError::InvalidInput(
                "form_namespace cannot be empty".into(),
            ));
        }

        if upload_dir.as_os_str().is_empty() {
            return Err(FormError::InvalidInput("upload_dir cannot be empty".into()));
        }

        Ok(Self {
            form_namespace,
            upload_dir,
        })
    }

    /// Build a configuration from optional raw values (for example `FORM_NAMESPACE` and
    /// `FORM_UPLOAD_DIR` read by the host).
    ///
    /// Missing or whitespace-only values fall back to the defaults.
    pub fn from_env_values(
        form_namespace: Option<String>,
        upload_dir: Option<String>,
    ) -> FormResult<Self> {
        fn non_blank(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self::new(
            non_blank(form_namespace).unwrap_or_else(|| DEFAULT_FORM_NAMESPACE.to_string()),
            non_blank(upload_dir)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
        )
    }

    pub fn form_namespace(&self) -> &str {
        &self.form_namespace
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }
}
