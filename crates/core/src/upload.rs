//! Upload seam for file widgets.

use form_files::UploadStore;

use crate::FormResult;

/// Stores the content of a data URL and returns the URL the widget keeps as its value.
pub trait FileUploader {
    fn upload_file(&self, data_url: &str) -> FormResult<String>;
}

impl FileUploader for UploadStore {
    fn upload_file(&self, data_url: &str) -> FormResult<String> {
        let stored = self.store_data_url(data_url)?;
        Ok(stored.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FormError;

    const GIF: &str = "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

    #[test]
    fn store_returns_content_addressed_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path()).expect("store");

        let url = store.upload_file(GIF).expect("upload");

        assert!(url.starts_with("sha256/"));
        assert!(store.root_directory().join(&url).is_file());
        assert_eq!(store.upload_file(GIF).expect("second upload"), url);
    }

    #[test]
    fn malformed_data_url_is_a_files_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = UploadStore::new(dir.path()).expect("store");

        let err = store.upload_file("not a data url").err().expect("error");
        assert!(matches!(err, FormError::Files(_)));
    }
}
