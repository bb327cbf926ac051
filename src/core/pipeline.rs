use crate::adapters::json_source;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{RunReport, SourceBundle};
use crate::domain::ports::{LlmClient, WorkflowMode};
use crate::graph::{build_graphs, ProgramGraphs};
use crate::utils::error::{AgentError, Result};
use crate::workflow::{doc_file_name, forward, reverse};
use std::path::Path;
use std::sync::Arc;

pub const INDEX_FILE: &str = "index.md";

/// Reads parser output, builds the program graphs and documents them with an LLM.
pub struct DocumentationPipeline<S: Storage, C: ConfigProvider, L: LlmClient> {
    storage: Arc<S>,
    config: C,
    llm: Arc<L>,
}

impl<S: Storage, C: ConfigProvider, L: LlmClient> DocumentationPipeline<S, C, L> {
    pub fn new(storage: S, config: C, llm: L) -> Self {
        Self {
            storage: Arc::new(storage),
            config,
            llm: Arc::new(llm),
        }
    }

    fn build_fresh_graphs(&self, sources: &SourceBundle) -> Result<ProgramGraphs> {
        let graphs = build_graphs(&sources.jcl, &sources.cobol)?;
        if let Some(cache) = self.config.graph_cache() {
            match graphs.save_cache(cache) {
                Ok(()) => tracing::info!("💾 Graphs cached to {}", cache),
                // 快取失敗不影響本次執行
                Err(e) => tracing::warn!("Failed to write graph cache {}: {}", cache, e),
            }
        }
        Ok(graphs)
    }

    fn render_index(&self, report: &RunReport, failed: &[String]) -> String {
        let mut index = String::from("# Generated Documentation\n\n");
        index.push_str(&format!(
            "Generated at {} with model `{}` ({} mode).\n\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            self.llm.model(),
            mode_name(self.config.workflow_mode()),
        ));

        index.push_str("## Components\n\n");
        for file in &report.written_files {
            let name = file.trim_end_matches(".md");
            index.push_str(&format!("- [{}]({})\n", name, file));
        }

        if !failed.is_empty() {
            index.push_str("\n## Failed Components\n\n");
            for id in failed {
                index.push_str(&format!("- {} ({})\n", id, doc_file_name(id)));
            }
        }
        index
    }
}

fn mode_name(mode: WorkflowMode) -> &'static str {
    match mode {
        WorkflowMode::Reverse => "reverse",
        WorkflowMode::Forward => "forward",
    }
}

#[async_trait::async_trait]
impl<S, C, L> Pipeline for DocumentationPipeline<S, C, L>
where
    S: Storage + 'static,
    C: ConfigProvider,
    L: LlmClient + 'static,
{
    async fn extract(&self) -> Result<SourceBundle> {
        let input_dir = self.config.input_dir();
        tracing::debug!("Loading parser output from {}", input_dir);
        let sources = json_source::load_sources(
            Path::new(input_dir),
            self.config.jcl_pattern(),
            self.config.cobol_pattern(),
        )?;

        if sources.is_empty() {
            return Err(AgentError::NoInputDataError {
                dir: input_dir.to_string(),
            });
        }
        Ok(sources)
    }

    async fn transform(&self, sources: SourceBundle) -> Result<ProgramGraphs> {
        if let Some(cache) = self.config.graph_cache() {
            if Path::new(cache).exists() {
                match ProgramGraphs::load_cache(cache) {
                    Ok(graphs) => {
                        tracing::info!("📦 Loaded graphs from cache {}", cache);
                        return Ok(graphs);
                    }
                    Err(e) => {
                        tracing::warn!("Graph cache {} is unreadable ({}), rebuilding", cache, e)
                    }
                }
            }
        }
        self.build_fresh_graphs(&sources)
    }

    async fn load(&self, graphs: ProgramGraphs) -> Result<RunReport> {
        let limit = self.config.recursion_limit();
        tracing::info!(
            "Running {} documentation workflow with model {}",
            mode_name(self.config.workflow_mode()),
            self.llm.model()
        );

        let (documented, failed, written) = match self.config.workflow_mode() {
            WorkflowMode::Reverse => {
                let state = reverse::run_reverse_documentation(
                    self.llm.clone(),
                    self.storage.clone(),
                    graphs,
                    limit,
                )
                .await?;
                (state.documentation.len(), state.failed, state.written_files)
            }
            WorkflowMode::Forward => {
                let state = forward::run_forward_documentation(
                    self.llm.clone(),
                    self.storage.clone(),
                    graphs,
                    limit,
                )
                .await?;
                (state.documentation.len(), state.failed, state.written_files)
            }
        };

        let mut report = RunReport {
            output_dir: self.config.output_dir().to_string(),
            written_files: written,
            documented_components: documented,
            failed_components: failed.len(),
        };

        let index = self.render_index(&report, &failed);
        self.storage
            .write_file(INDEX_FILE, index.as_bytes())
            .await?;
        report.written_files.push(INDEX_FILE.to_string());

        Ok(report)
    }

    fn processing_order(&self, graphs: &ProgramGraphs) -> Vec<String> {
        match self.config.workflow_mode() {
            WorkflowMode::Reverse => reverse::reverse_processing_order(&graphs.outer),
            WorkflowMode::Forward => forward::forward_work_queue(graphs)
                .iter()
                .map(|item| item.id().to_string())
                .collect(),
        }
    }
}
