use crate::domain::model::{RunReport, SourceBundle};
use crate::graph::ProgramGraphs;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Location a relative path resolves to, for reporting.
    fn resolve(&self, path: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum WorkflowMode {
    /// Document from the end of the job stream back to its start.
    #[default]
    Reverse,
    /// Document components in graph order, one after the other.
    Forward,
}

pub trait ConfigProvider: Send + Sync {
    fn input_dir(&self) -> &str;
    fn jcl_pattern(&self) -> &str;
    fn cobol_pattern(&self) -> &str;
    fn output_dir(&self) -> &str;
    fn workflow_mode(&self) -> WorkflowMode;
    fn recursion_limit(&self) -> usize;
    fn graph_cache(&self) -> Option<&str>;
}

/// Completion endpoint of a chat model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
    fn model(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SourceBundle>;
    async fn transform(&self, sources: SourceBundle) -> Result<ProgramGraphs>;
    async fn load(&self, graphs: ProgramGraphs) -> Result<RunReport>;
    /// Order in which `load` would document the components.
    fn processing_order(&self, graphs: &ProgramGraphs) -> Vec<String>;
}
