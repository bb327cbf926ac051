use crate::core::Pipeline;
use crate::domain::model::RunReport;
use crate::graph::{GraphSummary, ProgramGraphs};
use crate::utils::error::Result;
use std::time::Instant;

pub struct DocEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> DocEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    async fn build(&self) -> Result<ProgramGraphs> {
        tracing::info!("📥 Extracting parser output...");
        let sources = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} JCL and {} COBOL records",
            sources.jcl.len(),
            sources.cobol.len()
        );

        tracing::info!("🔧 Building program graphs...");
        let graphs = self.pipeline.transform(sources).await?;
        log_summary(&graphs.summary());
        Ok(graphs)
    }

    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        tracing::info!("Starting documentation process...");

        let graphs = self.build().await?;

        tracing::info!("📝 Generating documentation...");
        let report = self.pipeline.load(graphs).await?;
        tracing::info!(
            "Documented {} components ({} failed) in {:.1}s",
            report.documented_components,
            report.failed_components,
            started.elapsed().as_secs_f64()
        );

        Ok(report)
    }

    /// Extract and transform only; the LLM is never called.
    pub async fn graphs_only(&self) -> Result<GraphSummary> {
        let graphs = self.build().await?;
        Ok(graphs.summary())
    }

    /// The order components would be documented in, without calling the LLM.
    pub async fn dry_run(&self) -> Result<Vec<String>> {
        let graphs = self.build().await?;
        let order = self.pipeline.processing_order(&graphs);
        for (position, id) in order.iter().enumerate() {
            tracing::info!("{:>4}. {}", position + 1, id);
        }
        Ok(order)
    }
}

fn log_summary(summary: &GraphSummary) {
    tracing::info!(
        "Outer graph: {} nodes, {} edges ({} programs, {} placeholders, {} JCL steps)",
        summary.outer_nodes,
        summary.outer_edges,
        summary.programs,
        summary.placeholders,
        summary.jcl_steps
    );
    tracing::info!("Inner graphs: {} paragraphs", summary.paragraphs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{OuterNode, ProgramNode, SourceBundle};
    use crate::utils::error::AgentError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakePipeline {
        empty: bool,
        loads: AtomicUsize,
    }

    impl FakePipeline {
        fn new(empty: bool) -> Self {
            Self {
                empty,
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Pipeline for FakePipeline {
        async fn extract(&self) -> Result<SourceBundle> {
            if self.empty {
                return Err(AgentError::NoInputDataError {
                    dir: "nowhere".to_string(),
                });
            }
            Ok(SourceBundle {
                jcl: vec![serde_json::json!({})],
                cobol: Vec::new(),
            })
        }

        async fn transform(&self, _sources: SourceBundle) -> Result<ProgramGraphs> {
            let mut graphs = ProgramGraphs::default();
            graphs
                .outer
                .add_node("PAY01", OuterNode::Program(ProgramNode::placeholder("test")));
            Ok(graphs)
        }

        async fn load(&self, graphs: ProgramGraphs) -> Result<RunReport> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(RunReport {
                output_dir: "out".to_string(),
                written_files: vec!["PAY01.md".to_string()],
                documented_components: graphs.outer.node_count(),
                failed_components: 0,
            })
        }

        fn processing_order(&self, graphs: &ProgramGraphs) -> Vec<String> {
            graphs.outer.node_ids().map(str::to_string).collect()
        }
    }

    #[tokio::test]
    async fn test_run_goes_through_all_stages() {
        let engine = DocEngine::new(FakePipeline::new(false));
        let report = engine.run().await.unwrap();

        assert_eq!(report.documented_components, 1);
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_graphs_only_and_dry_run_skip_load() {
        let engine = DocEngine::new(FakePipeline::new(false));

        let summary = engine.graphs_only().await.unwrap();
        assert_eq!(summary.placeholders, 1);

        let order = engine.dry_run().await.unwrap();
        assert_eq!(order, vec!["PAY01"]);
        assert_eq!(engine.pipeline.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extract_error_propagates() {
        let engine = DocEngine::new(FakePipeline::new(true));
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, AgentError::NoInputDataError { .. }));
    }
}
