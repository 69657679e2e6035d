use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestLensError {
    #[error("API request failed: {status} {status_text}")]
    Transport { status: u16, status_text: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TestLensError {
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, TestLensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display_includes_status() {
        let err = TestLensError::Transport {
            status: 404,
            status_text: "Not Found".to_string(),
        };

        assert_eq!(err.to_string(), "API request failed: 404 Not Found");
        assert!(!err.is_config());
    }

    #[test]
    fn test_config_error_is_config() {
        let err = TestLensError::Config("organization is not set".to_string());

        assert!(err.is_config());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: organization is not set"
        );
    }
}
