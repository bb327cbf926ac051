use crate::utils::error::{AgentError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(AgentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AgentError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(AgentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AgentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(AgentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(AgentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| AgentError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AgentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AgentError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("llm.base_url", "https://api.openai.com/v1").is_ok());
        assert!(validate_url("llm.base_url", "http://localhost:11434/v1").is_ok());
        assert!(validate_url("llm.base_url", "").is_err());
        assert!(validate_url("llm.base_url", "invalid-url").is_err());
        assert!(validate_url("llm.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("workflow.recursion_limit", 5000, 1).is_ok());
        assert!(validate_positive_number("workflow.recursion_limit", 0, 1).is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let key: Option<String> = None;
        match validate_required_field("llm.api_key", &key) {
            Err(AgentError::MissingConfigError { field }) => assert_eq!(field, "llm.api_key"),
            other => panic!("unexpected result: {:?}", other),
        }

        let key = Some("sk-test".to_string());
        assert_eq!(validate_required_field("llm.api_key", &key).unwrap(), "sk-test");
    }

    #[test]
    fn test_validate_range_and_strings() {
        assert!(validate_range("llm.timeout_seconds", 120u64, 1, 3600).is_ok());
        assert!(validate_range("llm.timeout_seconds", 0u64, 1, 3600).is_err());
        assert!(validate_non_empty_string("llm.model", "   ").is_err());
        assert!(validate_path("output.dir", "docs\0").is_err());
    }
}
