use crate::domain::ports::{ConfigProvider, WorkflowMode};
use crate::utils::error::{AgentError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub llm: LlmSettings,
    pub workflow: WorkflowConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub dir: String,
    pub jcl_pattern: String,
    pub cobol_pattern: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: "test_data".to_string(),
            jcl_pattern: "jcl/*.json".to_string(),
            cobol_pattern: "cobol/*/*.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "generated_documentation".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is not set.
    pub api_key_env: String,
    pub temperature: Option<f32>,
    /// `low`/`medium`/`high`, or `none` to never send it. Unset means `high`
    /// for reasoning models and nothing for the others.
    pub reasoning_effort: Option<String>,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "o4-mini".to_string(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: None,
            reasoning_effort: None,
            timeout_seconds: 300,
            max_retries: 2,
            retry_delay_ms: 2000,
        }
    }
}

impl LlmSettings {
    /// Explicit key first, then the configured environment variable.
    ///
    /// A `${VAR}` left behind by substitution counts as no key at all.
    pub fn resolve_api_key(&mut self) {
        let missing = self
            .api_key
            .as_deref()
            .map(|k| k.trim().is_empty() || is_unresolved_placeholder(k))
            .unwrap_or(true);
        if missing {
            self.api_key = std::env::var(&self.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
    }

    /// Reasoning effort actually sent with each request.
    pub fn effective_reasoning_effort(&self) -> Option<&str> {
        match self.reasoning_effort.as_deref().map(str::trim) {
            Some("") | Some("none") => None,
            Some(effort) => Some(effort),
            None if is_reasoning_model(&self.model) => Some("high"),
            None => None,
        }
    }

    /// Remote endpoints need a key; a local OpenAI-compatible server may not.
    pub fn requires_api_key(&self) -> bool {
        url::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .map(|host| !matches!(host.as_str(), "localhost" | "127.0.0.1" | "::1" | "[::1]"))
            .unwrap_or(true)
    }
}

fn is_unresolved_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("${") && value.ends_with('}')
}

/// o-series and gpt-5 models accept `reasoning_effort`; chat models reject it.
fn is_reasoning_model(model: &str) -> bool {
    let model = model.rsplit('/').next().unwrap_or(model);
    let o_series = model.starts_with('o') && model[1..].starts_with(|c: char| c.is_ascii_digit());
    o_series || model.starts_with("gpt-5")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub mode: WorkflowMode,
    pub recursion_limit: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            mode: WorkflowMode::Reverse,
            recursion_limit: 5000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub graph_cache: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: Option<String>,
    pub json: bool,
}

impl AgentConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        let mut config: AgentConfig = toml::from_str(&processed_content)?;
        config.llm.resolve_api_key();
        Ok(config)
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| AgentError::ConfigError {
            message: format!("environment substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("input.dir", &self.input.dir)?;
        validation::validate_non_empty_string("input.jcl_pattern", &self.input.jcl_pattern)?;
        validation::validate_non_empty_string("input.cobol_pattern", &self.input.cobol_pattern)?;
        validation::validate_path("output.dir", &self.output.dir)?;

        validation::validate_url("llm.base_url", &self.llm.base_url)?;
        validation::validate_non_empty_string("llm.model", &self.llm.model)?;
        validation::validate_range("llm.timeout_seconds", self.llm.timeout_seconds, 1, 3600)?;
        if let Some(temperature) = self.llm.temperature {
            validation::validate_range("llm.temperature", temperature, 0.0, 2.0)?;
        }
        if let Some(effort) = &self.llm.reasoning_effort {
            let valid = ["low", "medium", "high", "none"];
            if !effort.trim().is_empty() && !valid.contains(&effort.trim()) {
                return Err(AgentError::InvalidConfigValueError {
                    field: "llm.reasoning_effort".to_string(),
                    value: effort.clone(),
                    reason: format!("Valid values: {}", valid.join(", ")),
                });
            }
        }

        validation::validate_positive_number(
            "workflow.recursion_limit",
            self.workflow.recursion_limit,
            1,
        )?;

        if let Some(cache) = &self.cache.graph_cache {
            validation::validate_path("cache.graph_cache", cache)?;
        }

        Ok(())
    }
}

impl ConfigProvider for AgentConfig {
    fn input_dir(&self) -> &str {
        &self.input.dir
    }

    fn jcl_pattern(&self) -> &str {
        &self.input.jcl_pattern
    }

    fn cobol_pattern(&self) -> &str {
        &self.input.cobol_pattern
    }

    fn output_dir(&self) -> &str {
        &self.output.dir
    }

    fn workflow_mode(&self) -> WorkflowMode {
        self.workflow.mode
    }

    fn recursion_limit(&self) -> usize {
        self.workflow.recursion_limit
    }

    fn graph_cache(&self) -> Option<&str> {
        self.cache.graph_cache.as_deref()
    }
}

impl Validate for AgentConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
