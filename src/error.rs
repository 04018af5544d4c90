use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaixaError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unreadable spreadsheet: {0}")]
    Parse(String),

    #[error("Missing owner id")]
    MissingOwner,

    #[error("Upload not found: {0}")]
    UploadNotFound(String),

    #[error("Unknown subscription: {0}")]
    UnknownSubscription(i64),

    #[error("Unknown entry: {0}")]
    UnknownEntry(i64),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CaixaError>;

/// A push attempt that the transport could not complete.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("push request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("push service returned HTTP {0}")]
    HttpStatus(u16),

    #[error("could not sign push credentials: {0}")]
    Signing(String),

    #[error("push rejected: {0}")]
    Rejected(String),
}
