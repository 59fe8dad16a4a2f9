//! Content-addressed upload store implementation
//!
//! Uploads arrive the way a browser file reader produces them: as a data URL
//! (`data:<mime>;base64,<payload>`). The store decodes the payload, hashes it with SHA-256
//! and writes it under a sharded path derived from the hash. The relative path doubles as
//! the URL stored in the observation value.
//!
//! # Content Addressing
//!
//! - **Deduplication**: identical content is stored once and yields the same URL
//! - **Integrity**: content can be verified against its hash
//! - **Deterministic paths**: same content always produces the same path

use crate::FilesError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level folder for SHA-256 addressed content.
pub const HASH_FOLDER_NAME: &str = "sha256";

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Declared media type, if the URL carried one
    pub media_type: Option<String>,

    /// Decoded payload
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Parses a base64 `data:` URL.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidDataUrl`] if the prefix, the `;base64` marker or the
    /// comma separator is missing, and [`FilesError::InvalidBase64`] if the payload does not
    /// decode.
    pub fn parse(input: &str) -> Result<Self, FilesError> {
        let rest = input
            .strip_prefix("data:")
            .ok_or_else(|| FilesError::InvalidDataUrl("missing 'data:' prefix".into()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| FilesError::InvalidDataUrl("missing ',' separator".into()))?;

        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| FilesError::InvalidDataUrl("only base64 payloads are supported".into()))?;

        let bytes = STANDARD.decode(payload.trim())?;

        Ok(Self {
            media_type: (!media_type.is_empty()).then(|| media_type.to_string()),
            bytes,
        })
    }
}

/// Metadata for a stored upload
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct StoredFile {
    /// Hexadecimal SHA-256 digest of the content
    pub hash: String,

    /// Reference handed back to the control, relative to the upload directory
    pub url: String,

    /// Size of the content in bytes
    pub size_bytes: u64,

    /// Detected media type, falling back to the declared one
    pub media_type: Option<String>,

    /// UTC timestamp when the content was first written
    pub stored_at: DateTime<Utc>,
}

/// Content-addressed store rooted at an upload directory.
#[derive(Debug)]
pub struct UploadStore {
    root_directory: PathBuf,
}

impl UploadStore {
    /// Creates a store rooted at `root_directory`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidUploadDirectory`] if the path exists but is not a
    /// directory or cannot be created/canonicalised.
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(FilesError::InvalidUploadDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidUploadDirectory(format!(
                "Cannot create {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidUploadDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Stores the payload of a base64 data URL and returns its metadata.
    ///
    /// Storing content that is already present is not an error: the existing file is kept
    /// and the same URL is returned.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if the data URL is malformed or the write fails.
    pub fn store_data_url(&self, data_url: &str) -> Result<StoredFile, FilesError> {
        let decoded = DataUrl::parse(data_url)?;
        self.store_bytes(&decoded.bytes, decoded.media_type)
    }

    /// Stores raw bytes with an optional declared media type.
    pub fn store_bytes(
        &self,
        bytes: &[u8],
        declared_media_type: Option<String>,
    ) -> Result<StoredFile, FilesError> {
        let hash = hex::encode(Sha256::digest(bytes));
        let url = relative_path(&hash);
        let storage_path = self.root_directory.join(&url);

        if storage_path.exists() {
            tracing::debug!("upload {} already stored", hash);
        } else {
            if let Some(parent) = storage_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&storage_path, bytes)?;
            tracing::info!("stored upload {} ({} bytes)", hash, bytes.len());
        }

        // Detection is best-effort; the declared type covers formats infer cannot sniff.
        let media_type = infer::get(bytes)
            .map(|kind| kind.mime_type().to_string())
            .or(declared_media_type);

        let stored_at = fs::metadata(&storage_path)
            .and_then(|metadata| metadata.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(StoredFile {
            hash,
            url,
            size_bytes: bytes.len() as u64,
            media_type,
            stored_at,
        })
    }

    /// Reads previously stored content by its hash.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidHash`] if `hash` is not 64 lowercase hex characters and
    /// [`FilesError::Io`] if nothing is stored under it.
    pub fn read(&self, hash: &str) -> Result<Vec<u8>, FilesError> {
        let is_sha256_hex =
            hash.len() == 64 && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !is_sha256_hex {
            return Err(FilesError::InvalidHash(hash.to_string()));
        }

        Ok(fs::read(self.root_directory.join(relative_path(hash)))?)
    }

    /// Returns the canonicalised upload directory.
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }
}

/// `sha256/<h[0..2]>/<h[2..4]>/<h>`
fn relative_path(hash_hex: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        HASH_FOLDER_NAME,
        &hash_hex[0..2],
        &hash_hex[2..4],
        hash_hex
    )
}
