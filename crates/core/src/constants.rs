//! Constants used throughout the form controls core crate.

/// Namespace stamped on observations created from form metadata.
pub const DEFAULT_FORM_NAMESPACE: &str = "Bahmni";

/// Default directory for uploaded files when no explicit directory is configured.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Registry key of the free-text widget.
pub const TEXT_CONTROL_KEY: &str = "text";

/// Registry key of the numeric entry widget.
pub const NUMERIC_CONTROL_KEY: &str = "numeric";

/// Registry key of the image/document upload widget.
pub const COMPLEX_CONTROL_KEY: &str = "complex";

/// Media types the upload widget accepts. A trailing `/*` matches any subtype.
pub const SUPPORTED_FILE_TYPES: [&str; 2] = ["application/pdf", "image/*"];

/// Icon displayed in place of an uploaded PDF document.
pub const PDF_ICON_PATH: &str = "../../../../bahmni/images/pdfIcon.png";

/// Repeat index of the original (non add-more) instance of a control.
pub const ORIGINAL_REPEAT_INDEX: u32 = 0;
