use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("version control error: {0}")]
    VersionControl(String),
    #[error("not a git repository: {0}")]
    NotARepository(String),
    #[error("file is not tracked by git: {0}")]
    FileUntracked(String),
    #[error("no changes detected in {0}")]
    NoChanges(String),
    #[error(
        "Changes are too large to analyze ({size_mib:.2} MB). Maximum size is {limit_mib:.2} MB."
    )]
    DiffTooLarge { size_mib: f64, limit_mib: f64 },
    #[error("Request timeout: Cannot reach backend API at {url} within {seconds} seconds.")]
    Timeout { url: String, seconds: String },
    #[error(
        "Cannot reach backend API at {url}. Please check if the server is running and the URL is correct."
    )]
    Unreachable { url: String },
    #[error(
        "SSL certificate verification failed. If using a self-signed certificate, enable 'allow_insecure_ssl' in the configuration (development only)."
    )]
    TlsVerificationFailed,
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("Invalid response format: expected {{ intent: string }} ({0})")]
    MalformedResponse(String),
    #[error("{0}")]
    Unknown(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AppError {
    pub fn diff_too_large(size_bytes: usize, limit_bytes: usize) -> Self {
        AppError::DiffTooLarge {
            size_mib: to_mib(size_bytes),
            limit_mib: to_mib(limit_bytes),
        }
    }
}

fn to_mib(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

pub type AppResult<T> = Result<T, AppError>;
