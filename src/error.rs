use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReformaError {
    #[error("Highlight not found: {0}")]
    AnchorNotFound(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid restore code: {0}")]
    InvalidRestoreCode(String),

    #[error("Restore code belongs to {expected}, not {actual}")]
    RestoreCodeUrlMismatch { expected: String, actual: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("HTML parse error: {0}")]
    HtmlParse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Native messaging error: {0}")]
    MessagingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReformaError>;
