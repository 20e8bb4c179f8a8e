use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Cannot read input '{path}': {source}")]
    InputUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Remote computation failed: {message}")]
    RemoteComputation { message: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, EnrichError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EnrichError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteComputation {
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ValidationError { .. } => ErrorSeverity::Low,
            Self::HttpError(_) | Self::RemoteComputation { .. } | Self::Timeout { .. } => {
                ErrorSeverity::Medium
            }
            Self::CsvError(_) | Self::SerializationError(_) => ErrorSeverity::High,
            Self::InputUnreadable { .. }
            | Self::IoError(_)
            | Self::ConfigError { .. }
            | Self::InvalidConfigValue { .. }
            | Self::MissingConfig { .. } => ErrorSeverity::Critical,
        }
    }

    /// Transport and service faults are worth another attempt; everything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_) | Self::RemoteComputation { .. } | Self::Timeout { .. }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::InputUnreadable { path, .. } => {
                format!("Input file '{}' could not be read", path)
            }
            Self::HttpError(_) | Self::Timeout { .. } => {
                "A remote service did not answer in time".to_string()
            }
            Self::RemoteComputation { .. } => "The raster analytics service failed".to_string(),
            Self::CsvError(_) => "An input or output table is malformed".to_string(),
            Self::ConfigError { .. }
            | Self::InvalidConfigValue { .. }
            | Self::MissingConfig { .. } => format!("Configuration problem: {}", self),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::InputUnreadable { .. } => "Check that the input path exists and is readable",
            Self::HttpError(_) | Self::Timeout { .. } | Self::RemoteComputation { .. } => {
                "Check network access and the service endpoints, then rerun"
            }
            Self::CsvError(_) => "Make sure the table has Village, Latitude and Longitude columns",
            Self::ConfigError { .. }
            | Self::InvalidConfigValue { .. }
            | Self::MissingConfig { .. } => "Fix the configuration file and try again",
            _ => "Rerun with --verbose for more detail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_input_is_critical() {
        let err = EnrichError::InputUnreadable {
            path: "villages.txt".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!err.is_transient());
        assert!(err.user_friendly_message().contains("villages.txt"));
    }

    #[test]
    fn remote_faults_are_transient() {
        assert!(EnrichError::remote("quota exceeded").is_transient());
        assert!(EnrichError::Timeout {
            operation: "reduce".to_string(),
            seconds: 5
        }
        .is_transient());
        assert!(!EnrichError::ConfigError {
            message: "x".to_string()
        }
        .is_transient());
    }
}
