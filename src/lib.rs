pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod graph;
pub mod llm;
pub mod utils;
pub mod workflow;

pub use adapters::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::{AgentConfig, LlmSettings};
pub use core::{engine::DocEngine, pipeline::DocumentationPipeline};
pub use domain::ports::WorkflowMode;
pub use graph::{build_graphs, ProgramGraphs};
pub use llm::OpenAiClient;
pub use utils::error::{AgentError, Result};
