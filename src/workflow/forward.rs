//! Forward documentation: components in graph order, each prompt carrying the
//! documentation written for the component before it.

use crate::domain::model::{EdgeKind, OuterNode};
use crate::domain::ports::{LlmClient, Storage};
use crate::graph::ProgramGraphs;
use crate::llm::prompts::{self, ForwardComponent};
use crate::utils::error::Result;
use crate::workflow::engine::{CompiledWorkflow, StateGraph, WorkflowNode, END, START};
use crate::workflow::{check_step_budget, DocumentationSet, DocumentationState, SaveNode};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Outer(String),
    Paragraph { program: String, id: String },
}

impl WorkItem {
    pub fn id(&self) -> &str {
        match self {
            WorkItem::Outer(id) => id,
            WorkItem::Paragraph { id, .. } => id,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForwardState {
    pub graphs: ProgramGraphs,
    pub queue: VecDeque<WorkItem>,
    pub current: Option<WorkItem>,
    pub previous: Option<String>,
    pub documentation: DocumentationSet,
    pub failed: Vec<String>,
    pub written_files: Vec<String>,
}

impl DocumentationState for ForwardState {
    fn documentation(&self) -> &DocumentationSet {
        &self.documentation
    }

    fn record_written(&mut self, files: Vec<String>) {
        self.written_files = files;
    }
}

/// Outer nodes in insertion order, each program followed by its paragraphs sorted by id.
pub fn forward_work_queue(graphs: &ProgramGraphs) -> Vec<WorkItem> {
    let mut queue = Vec::new();
    for (id, node) in graphs.outer.nodes() {
        queue.push(WorkItem::Outer(id.to_string()));

        let has_inner = node.as_program().is_some_and(|p| p.has_inner_graph);
        if let (true, Some(inner)) = (has_inner, graphs.inner.get(id)) {
            let mut paragraphs: Vec<&str> = inner.node_ids().collect();
            paragraphs.sort_unstable();
            queue.extend(paragraphs.into_iter().map(|para| WorkItem::Paragraph {
                program: id.to_string(),
                id: para.to_string(),
            }));
        }
    }
    queue
}

pub fn initialize_forward_state(graphs: ProgramGraphs) -> ForwardState {
    let queue: VecDeque<WorkItem> = forward_work_queue(&graphs).into();
    tracing::info!(
        "Initializing forward documentation workflow with {} components",
        queue.len()
    );
    ForwardState {
        graphs,
        queue,
        ..ForwardState::default()
    }
}

/// Prompt for a work item, or `None` when the item is not in the graphs.
fn prompt_for(graphs: &ProgramGraphs, item: &WorkItem, previous: Option<&str>) -> Option<String> {
    match item {
        WorkItem::Outer(id) => {
            let node = graphs.outer.node(id)?;
            let prompt = match node {
                OuterNode::JclJob { job_name } => {
                    let steps: Vec<String> = graphs
                        .outer
                        .successors(id)
                        .filter(|s| graphs.outer.edge(id, s) == Some(&EdgeKind::ContainsStep))
                        .map(str::to_string)
                        .collect();
                    prompts::forward_prompt(
                        id,
                        &ForwardComponent::JclJob {
                            job_name,
                            steps: &steps,
                        },
                        previous,
                    )
                }
                OuterNode::JclStep(step) => {
                    prompts::forward_prompt(id, &ForwardComponent::JclStep(step), previous)
                }
                OuterNode::Program(program) => {
                    prompts::forward_prompt(id, &ForwardComponent::Program(program), previous)
                }
            };
            Some(prompt)
        }
        WorkItem::Paragraph { program, id } => {
            let paragraph = graphs.inner.get(program)?.node(id)?;
            Some(prompts::forward_prompt(
                id,
                &ForwardComponent::Paragraph {
                    program_id: program,
                    name: &paragraph.name,
                    code: &paragraph.code_with_comments,
                },
                previous,
            ))
        }
    }
}

pub struct SelectNextComponent;

#[async_trait]
impl WorkflowNode<ForwardState> for SelectNextComponent {
    async fn run(&self, state: &mut ForwardState) -> Result<()> {
        state.current = state.queue.pop_front();
        if let Some(item) = &state.current {
            tracing::info!("Selected next component: {}", item);
        }
        Ok(())
    }
}

pub struct DocumentComponent<L> {
    llm: Arc<L>,
}

impl<L> DocumentComponent<L> {
    pub fn new(llm: Arc<L>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl<L: LlmClient + 'static> WorkflowNode<ForwardState> for DocumentComponent<L> {
    async fn run(&self, state: &mut ForwardState) -> Result<()> {
        let Some(item) = state.current.clone() else {
            return Ok(());
        };

        let Some(prompt) = prompt_for(&state.graphs, &item, state.previous.as_deref()) else {
            tracing::error!("Component {} not found in graph", item);
            state.failed.push(item.id().to_string());
            state.previous = Some(format!("Error: Component {} not found in graph.", item));
            return Ok(());
        };

        let doc = match self.llm.complete(&prompt).await {
            Ok(doc) => {
                tracing::debug!("Generated documentation for {}", item);
                doc
            }
            Err(e) => {
                tracing::error!("Error generating documentation for {}: {}", item, e);
                state.failed.push(item.id().to_string());
                format!("Error generating documentation: {}", e)
            }
        };

        state.previous = Some(doc.clone());
        state.documentation.insert(item.id(), doc);
        Ok(())
    }
}

pub fn build_forward_workflow<L, St>(
    llm: Arc<L>,
    storage: Arc<St>,
) -> Result<CompiledWorkflow<ForwardState>>
where
    L: LlmClient + 'static,
    St: Storage + 'static,
{
    StateGraph::new("forward_documentation")
        .add_node("select_next_component", SelectNextComponent)
        .add_node("document_component", DocumentComponent::new(llm))
        .add_node("save_documentation", SaveNode::new(storage))
        .add_edge(START, "select_next_component")
        .add_conditional_edges(
            "select_next_component",
            |state: &ForwardState| {
                if state.current.is_some() {
                    "document"
                } else {
                    "done"
                }
            },
            &[("document", "document_component"), ("done", "save_documentation")],
        )
        .add_edge("document_component", "select_next_component")
        .add_edge("save_documentation", END)
        .compile()
}

pub async fn run_forward_documentation<L, St>(
    llm: Arc<L>,
    storage: Arc<St>,
    graphs: ProgramGraphs,
    recursion_limit: usize,
) -> Result<ForwardState>
where
    L: LlmClient + 'static,
    St: Storage + 'static,
{
    let workflow = build_forward_workflow(llm, storage)?;
    let state = initialize_forward_state(graphs);
    check_step_budget(workflow.name(), state.queue.len(), recursion_limit)?;
    let result = workflow.invoke(state, recursion_limit).await?;
    tracing::info!("Forward documentation workflow completed successfully");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graphs;
    use crate::workflow::test_support::{MemoryStorage, ScriptedLlm};
    use serde_json::json;

    fn sample_graphs() -> ProgramGraphs {
        let cobol = vec![
            json!({
                "program_id": "PAY01",
                "procedure_division": {"paragraph": {
                    "paragraph_name": "ENTRY", "paragraph_order": 1,
                    "code_with_comments": "PERFORM WRAP-UP.", "perform_targets": ["WRAP-UP"]
                }}
            }),
            json!({
                "program_id": "PAY01",
                "procedure_division": {"paragraph": {
                    "paragraph_name": "WRAP-UP", "paragraph_order": 2,
                    "code_with_comments": "STOP RUN."
                }}
            }),
        ];
        let jcl = vec![json!({"jobName": "PAYJOB", "step": {"stepName": "STEP01", "programId": "PAY01"}})];
        build_graphs(&jcl, &cobol).unwrap()
    }

    #[test]
    fn test_queue_follows_programs_with_their_paragraphs() {
        let queue = forward_work_queue(&sample_graphs());
        let ids: Vec<&str> = queue.iter().map(WorkItem::id).collect();
        assert_eq!(
            ids,
            vec!["PAY01", "PAY01:ENTRY", "PAY01:WRAP-UP", "PAYJOB", "PAYJOB:STEP01"]
        );
        // The step id contains ':' but is still an outer component.
        assert_eq!(queue[4], WorkItem::Outer("PAYJOB:STEP01".to_string()));
    }

    #[tokio::test]
    async fn test_each_prompt_carries_previous_documentation() {
        let llm = Arc::new(ScriptedLlm::default());
        let storage = Arc::new(MemoryStorage::default());

        let state = run_forward_documentation(llm.clone(), storage.clone(), sample_graphs(), 100)
            .await
            .unwrap();

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 5);
        assert!(prompts[0].contains("This is the first component being documented."));
        assert!(prompts[0].contains("Component type: program"));
        assert!(prompts[1].contains("---\ndoc-1\n---"));
        assert!(prompts[1].contains("This is COBOL paragraph 'ENTRY' of program 'PAY01'"));
        assert!(prompts[3].contains("Component type: jcl_job"));
        assert!(prompts[3].contains("with steps: PAYJOB:STEP01"));
        assert!(prompts[4].contains("Component type: jcl_step"));

        assert_eq!(state.documentation.len(), 5);
        assert_eq!(state.written_files.len(), 5);
        assert_eq!(storage.get_text("PAY01_WRAP-UP.md").await.unwrap(), "doc-3");
        assert_eq!(storage.get_text("PAYJOB_STEP01.md").await.unwrap(), "doc-5");
    }

    #[tokio::test]
    async fn test_missing_component_is_reported_as_previous_context() {
        let llm = Arc::new(ScriptedLlm::default());
        let storage = Arc::new(MemoryStorage::default());
        let workflow = build_forward_workflow(llm.clone(), storage.clone()).unwrap();

        let mut state = initialize_forward_state(sample_graphs());
        state.queue.push_front(WorkItem::Outer("GHOST".to_string()));
        let state = workflow.invoke(state, 100).await.unwrap();

        assert_eq!(state.failed, vec!["GHOST"]);
        assert!(!state.documentation.contains("GHOST"));
        assert!(llm.prompts()[0].contains("Error: Component GHOST not found in graph."));
    }

    #[tokio::test]
    async fn test_step_budget_counts_paragraphs() {
        let llm = Arc::new(ScriptedLlm::default());
        let storage = Arc::new(MemoryStorage::default());

        // Three outer components plus two paragraphs.
        let err = run_forward_documentation(llm.clone(), storage.clone(), sample_graphs(), 11)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("5 components need 12 steps"));
        assert!(llm.prompts().is_empty());
        assert!(storage.files.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_llm_failure_is_documented_and_processing_continues() {
        let llm = Arc::new(ScriptedLlm::failing_on("Component ID: PAY01:ENTRY"));
        let storage = Arc::new(MemoryStorage::default());

        let state = run_forward_documentation(llm, storage.clone(), sample_graphs(), 100)
            .await
            .unwrap();

        assert_eq!(state.failed, vec!["PAY01:ENTRY"]);
        let doc = storage.get_text("PAY01_ENTRY.md").await.unwrap();
        assert!(doc.starts_with("Error generating documentation:"));
        assert_eq!(state.written_files.len(), 5);
    }
}
