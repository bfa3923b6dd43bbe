use thiserror::Error;

/// Errors produced while reading models, talking to the catalog or writing reports
#[derive(Debug, Error)]
pub enum PartMatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Invalid catalog URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid model file {path}: {reason}")]
    InvalidModel { path: String, reason: String },

    #[error("Unexpected catalog response: {0}")]
    UnexpectedResponse(String),

    #[error("{0}")]
    Other(String),
}

impl PartMatchError {
    pub fn invalid_model(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidModel {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PartMatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_model_message() {
        let error = PartMatchError::invalid_model("faces/abc.dat", "missing numeric prefix");
        assert_eq!(
            error.to_string(),
            "Invalid model file faces/abc.dat: missing numeric prefix"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error: PartMatchError = io.into();
        assert!(matches!(error, PartMatchError::Io(_)));
    }
}
