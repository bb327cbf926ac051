use crate::config::AgentConfig;
use crate::domain::ports::WorkflowMode;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "adk-agent")]
#[command(about = "Generates documentation for COBOL/JCL systems from parser output with an LLM")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "ADK_AGENT_CONFIG")]
    pub config: Option<String>,

    /// Directory holding jcl/*.json and cobol/<program>/*.json parser output
    #[arg(long)]
    pub input_dir: Option<String>,

    /// Directory the markdown documentation is written to
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Documentation strategy
    #[arg(long, value_enum)]
    pub mode: Option<WorkflowMode>,

    /// Chat model name
    #[arg(long, env = "ADK_AGENT_MODEL")]
    pub model: Option<String>,

    /// Reasoning effort (low, medium, high, or none to leave it out of requests)
    #[arg(long)]
    pub reasoning_effort: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long, env = "ADK_AGENT_BASE_URL")]
    pub base_url: Option<String>,

    /// JSON file used to cache the built graphs between runs
    #[arg(long)]
    pub graph_cache: Option<String>,

    /// Maximum number of workflow steps
    #[arg(long)]
    pub recursion_limit: Option<usize>,

    /// Build the graphs (and the cache) and stop before calling the LLM
    #[arg(long)]
    pub graphs_only: bool,

    /// Show the processing order without calling the LLM
    #[arg(long)]
    pub dry_run: bool,

    /// Also write the log to this file (truncated on every run)
    #[arg(long)]
    pub log_file: Option<String>,

    /// Log as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Loads the configuration file (or defaults) and applies command line overrides.
    pub fn load_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::from_file(path)?,
            None => AgentConfig::from_toml_str("")?,
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut AgentConfig) {
        if let Some(dir) = &self.input_dir {
            config.input.dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(mode) = self.mode {
            config.workflow.mode = mode;
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(effort) = &self.reasoning_effort {
            config.llm.reasoning_effort = Some(effort.clone());
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = Some(temperature);
        }
        if let Some(base_url) = &self.base_url {
            config.llm.base_url = base_url.clone();
        }
        if let Some(cache) = &self.graph_cache {
            config.cache.graph_cache = Some(cache.clone());
        }
        if let Some(limit) = self.recursion_limit {
            config.workflow.recursion_limit = limit;
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.clone());
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}
