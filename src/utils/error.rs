use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("No parser JSON found under {dir}")]
    NoInputDataError { dir: String },

    #[error("Graph error: {message}")]
    GraphError { message: String },

    #[error("LLM endpoint returned HTTP {status}: {body}")]
    LlmStatusError { status: u16, body: String },

    #[error("Unexpected LLM response: {message}")]
    LlmResponseError { message: String },

    #[error("Workflow error in '{node}': {message}")]
    WorkflowError { node: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Llm,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AgentError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AgentError::ConfigError { .. }
            | AgentError::InvalidConfigValueError { .. }
            | AgentError::MissingConfigError { .. }
            | AgentError::TomlParseError(_) => ErrorCategory::Configuration,
            AgentError::NoInputDataError { .. } | AgentError::SerializationError(_) => {
                ErrorCategory::Input
            }
            AgentError::HttpError(_) => ErrorCategory::Network,
            AgentError::LlmStatusError { .. } | AgentError::LlmResponseError { .. } => {
                ErrorCategory::Llm
            }
            AgentError::GraphError { .. } | AgentError::WorkflowError { .. } => {
                ErrorCategory::Processing
            }
            AgentError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Llm => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Processing => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AgentError::LlmStatusError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            AgentError::TomlParseError(_) => {
                "Check the configuration file for TOML syntax errors".to_string()
            }
            AgentError::ConfigError { .. } | AgentError::InvalidConfigValueError { .. } => {
                "Fix the configuration value or override it on the command line".to_string()
            }
            AgentError::MissingConfigError { field } => {
                format!("Set '{}' in the configuration file or environment", field)
            }
            AgentError::NoInputDataError { dir } => format!(
                "Place JCL parser output in {dir}/jcl/*.json and COBOL parser output in {dir}/cobol/<program>/*.json"
            ),
            AgentError::SerializationError(_) => {
                "Delete the graph cache or fix the malformed JSON input".to_string()
            }
            AgentError::HttpError(_) => {
                "Check network connectivity and the LLM base URL".to_string()
            }
            AgentError::LlmStatusError { status, .. } if *status == 401 || *status == 403 => {
                "Check that OPENAI_API_KEY (or llm.api_key) is valid".to_string()
            }
            AgentError::LlmStatusError { .. } | AgentError::LlmResponseError { .. } => {
                "Retry later or switch to another model with --model".to_string()
            }
            AgentError::GraphError { .. } => {
                "Inspect the parser output for inconsistent program or paragraph ids".to_string()
            }
            AgentError::WorkflowError { .. } => {
                "Raise workflow.recursion_limit or reduce the input size".to_string()
            }
            AgentError::IoError(_) => {
                "Check file permissions and available disk space".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Input problem: {}", self),
            ErrorCategory::Network => format!("Could not reach the LLM endpoint: {}", self),
            ErrorCategory::Llm => format!("The LLM request failed: {}", self),
            ErrorCategory::Processing => format!("Documentation run failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_status_retryable() {
        let err = AgentError::LlmStatusError {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = AgentError::LlmStatusError {
            status: 400,
            body: String::new(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_category_and_severity() {
        let err = AgentError::NoInputDataError {
            dir: "test_data".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.recovery_suggestion().contains("test_data/jcl"));

        let err = AgentError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
