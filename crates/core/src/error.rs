#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid form field path: '{0}'")]
    InvalidFormFieldPath(String),
    #[error("no control registered for type '{0}'")]
    UnknownControlType(String),
    #[error("control '{0}' has no concept datatype to select a widget")]
    MissingWidgetType(String),
    #[error("no control mounted at '{0}'")]
    UnknownControlPath(String),
    #[error("control at '{0}' is the original instance and cannot be removed")]
    OriginalInstanceNotRemovable(String),
    #[error("control '{0}' cannot be repeated")]
    NotRepeatable(String),

    #[error("form definition error: {0}")]
    Forms(#[from] forms::FormsError),
    #[error("upload storage error: {0}")]
    Files(#[from] form_files::FilesError),
    #[error("failed to serialize observations: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize observations: {0}")]
    Deserialization(serde_json::Error),
}

pub type FormResult<T> = std::result::Result<T, FormError>;
