//! Form upload storage
//!
//! This crate provides the default storage behind the upload side-channel of binary-valued
//! form controls (images and PDF documents).
//!
//! ## Design Principles
//!
//! - The observation only ever carries a reference (the returned URL), never the bytes
//! - Stored files are immutable and content-addressed, so re-uploading identical content
//!   yields the same reference
//! - All writes stay inside the configured upload directory
//!
//! ## Storage Model
//!
//! ```text
//! <upload_dir>/
//! └── sha256/
//!     └── ab/
//!         └── cd/
//!             └── abcd3f9e…
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use form_files::UploadStore;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = UploadStore::new(Path::new("uploads"))?;
//! let stored = store.store_data_url("data:image/gif;base64,R0lGODlhAQABAAAAACw=")?;
//! println!("{}", stored.url);
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::{DataUrl, StoredFile, UploadStore, HASH_FOLDER_NAME};

/// Errors that can occur during upload storage operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Upload directory cannot be used
    #[error("Invalid upload directory: {0}")]
    InvalidUploadDirectory(String),

    /// The payload is not a `data:<mime>;base64,<payload>` URL
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// The base64 payload could not be decoded
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Requested hash is malformed or unknown
    #[error("Invalid file hash: {0}")]
    InvalidHash(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
