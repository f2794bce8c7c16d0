use std::path::PathBuf;

use thiserror::Error;

/// Shown when a mandatory file is missing at submit time.
pub const MISSING_FILES_MESSAGE: &str = "Debes subir vídeo, transcript y template_map.";
/// Shown when the service rejects a request without saying why.
pub const REJECTED_FALLBACK_MESSAGE: &str = "No se pudo procesar";

/// Why a submission attempt ended without a result. `to_string()` is exactly
/// the text the form displays.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// A mandatory file is missing; nothing was sent.
    #[error("{}", MISSING_FILES_MESSAGE)]
    Validation,

    /// The service answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The request could not be completed or the reply could not be read.
    #[error("{0}")]
    Transport(String),

    /// A selected file could not be read while building the request.
    #[error("No se pudo leer {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SubmitError {
    /// Rejection carrying the service's message, or the fallback text.
    pub fn rejected(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| REJECTED_FALLBACK_MESSAGE.to_string());
        SubmitError::Rejected { status, message }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SubmitError::Validation)
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(e: reqwest::Error) -> Self {
        SubmitError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for SubmitError {
    fn from(e: serde_json::Error) -> Self {
        SubmitError::Transport(e.to_string())
    }
}

/// Failures while saving a job's captures locally.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No hay resultado que exportar")]
    NoResult,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Output request for {file} failed with status {status}")]
    Status { file: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
