//! Reverse documentation: components are documented from the end of the job
//! stream back to its start, so every prompt can describe what a component
//! prepares for the components that run after it.

use crate::domain::model::{EdgeKind, NodeKind, OuterNode};
use crate::domain::ports::{LlmClient, Storage};
use crate::graph::{InnerGraph, OuterGraph, ProgramGraphs};
use crate::llm::prompts;
use crate::utils::error::Result;
use crate::workflow::engine::{CompiledWorkflow, StateGraph, WorkflowNode, END, START};
use crate::workflow::{check_step_budget, DocumentationSet, DocumentationState, SaveNode};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;

/// Components shown as context when the current one has no successors.
const RECENT_CONTEXT_COMPONENTS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct ReverseState {
    pub graphs: ProgramGraphs,
    pub queue: VecDeque<String>,
    pub current: Option<String>,
    pub documentation: DocumentationSet,
    pub failed: Vec<String>,
    pub written_files: Vec<String>,
}

impl DocumentationState for ReverseState {
    fn documentation(&self) -> &DocumentationSet {
        &self.documentation
    }

    fn record_written(&mut self, files: Vec<String>) {
        self.written_files = files;
    }
}

/// Reversed topological order of the outer graph.
///
/// A cyclic graph (programs calling each other) falls back to programs,
/// then JCL steps, then JCL jobs, each group reversed.
pub fn reverse_processing_order(outer: &OuterGraph) -> Vec<String> {
    match outer.topological_sort() {
        Ok(mut order) => {
            order.reverse();
            tracing::info!("Using reverse topological order with {} nodes", order.len());
            order
        }
        Err(e) => {
            tracing::warn!("Outer graph is not a DAG ({}). Using grouped reverse order", e);
            let group = |kind: NodeKind| -> Vec<String> {
                outer
                    .nodes()
                    .filter(|(_, node)| node.kind() == kind)
                    .map(|(id, _)| id.to_string())
                    .rev()
                    .collect()
            };
            let mut order = group(NodeKind::Program);
            order.extend(group(NodeKind::JclStep));
            order.extend(group(NodeKind::JclJob));
            order
        }
    }
}

pub fn initialize_reverse_state(graphs: ProgramGraphs) -> ReverseState {
    let queue: VecDeque<String> = reverse_processing_order(&graphs.outer).into();
    tracing::info!(
        "Initializing reverse documentation workflow with {} nodes",
        queue.len()
    );
    ReverseState {
        graphs,
        queue,
        ..ReverseState::default()
    }
}

/// Documentation of components that run after `id` and were already documented.
pub fn future_context(outer: &OuterGraph, id: &str, docs: &DocumentationSet) -> String {
    let mut context = String::from("\n\n--- Context from Subsequent System Components ---\n");

    if docs.is_empty() {
        context.push_str(
            "This appears to be the last component in the system flow (first being documented in reverse).\n",
        );
        return context;
    }

    let successors: Vec<&str> = outer.successors(id).collect();
    let entries: Vec<(&str, &str)> = if successors.is_empty() {
        docs.last(RECENT_CONTEXT_COMPONENTS).collect()
    } else {
        successors
            .into_iter()
            .filter_map(|s| docs.get(s).map(|doc| (s, doc)))
            .collect()
    };

    for (component, doc) in entries {
        context.push_str(&format!("\n## Component: {}\n{}\n---\n", component, doc));
    }
    context
}

/// Paragraph ids in reversed execution order.
fn reverse_paragraph_order(program_id: &str, inner: &InnerGraph) -> Vec<String> {
    match inner.topological_sort() {
        Ok(mut order) => {
            order.reverse();
            order
        }
        Err(_) => {
            tracing::warn!(
                "Inner graph for {} is not a DAG. Using simple reversed paragraph list",
                program_id
            );
            inner.node_ids().rev().map(str::to_string).collect()
        }
    }
}

/// Documents a program paragraph by paragraph, last paragraph first, feeding
/// each paragraph prompt with the documentation of the paragraphs after it.
pub async fn document_program_in_reverse<L: LlmClient + ?Sized>(
    llm: &L,
    program_id: &str,
    inner: &InnerGraph,
    system_context: &str,
) -> String {
    let order = reverse_paragraph_order(program_id, inner);
    tracing::info!(
        "Documenting {} paragraphs in {} in reverse order",
        order.len(),
        program_id
    );

    let mut sections: VecDeque<String> = VecDeque::new();
    let mut later_paragraphs = String::new();

    for para_id in &order {
        let Some(paragraph) = inner.node(para_id) else {
            continue;
        };
        let prompt = prompts::paragraph_prompt(
            program_id,
            &paragraph.name,
            &paragraph.code_with_comments,
            system_context,
            &later_paragraphs,
        );

        tracing::info!(
            "Generating documentation for paragraph '{}' in program '{}'",
            paragraph.name,
            program_id
        );
        match llm.complete(&prompt).await {
            Ok(doc) => {
                sections.push_front(format!("### Paragraph: {}\n{}", paragraph.name, doc));
                later_paragraphs = sections.iter().cloned().collect::<Vec<_>>().join("\n\n");
            }
            Err(e) => {
                tracing::error!("Error documenting paragraph {}: {}", paragraph.name, e);
                sections.push_front(format!(
                    "### Paragraph: {}\nError generating documentation: {}",
                    paragraph.name, e
                ));
            }
        }
    }

    let mut doc = format!("# Documentation for COBOL Program: {}\n\n", program_id);
    doc.push_str("*This documentation was generated by analyzing paragraphs in reverse execution order, from program end to program start.*\n\n");
    doc.push_str(&sections.into_iter().collect::<Vec<_>>().join("\n\n"));
    doc
}

/// Documentation for one outer component, or the LLM error that prevented it.
async fn document_outer_node<L: LlmClient + ?Sized>(
    llm: &L,
    graphs: &ProgramGraphs,
    id: &str,
    context: &str,
) -> Result<String> {
    let Some(node) = graphs.outer.node(id) else {
        tracing::warn!("Component {} is not part of the outer graph", id);
        return Ok(format!(
            "# Documentation for {} (Type: unknown)\n\nUnsupported component type.\n",
            id
        ));
    };

    match node {
        OuterNode::Program(program) if program.is_placeholder => {
            tracing::info!(
                "Generating placeholder documentation for program '{}' which has no source code",
                id
            );
            llm.complete(&prompts::placeholder_prompt(id, program.note.as_deref(), context))
                .await
        }
        OuterNode::Program(program) => match graphs.inner.get(id) {
            Some(inner) => {
                tracing::info!(
                    "Generating documentation for COBOL program '{}' by reverse inner traversal",
                    id
                );
                Ok(document_program_in_reverse(llm, id, inner, context).await)
            }
            None => {
                tracing::warn!("No inner graph found for program {}. Generating basic doc", id);
                llm.complete(&prompts::program_prompt(id, program, context))
                    .await
            }
        },
        OuterNode::JclStep(step) => {
            tracing::info!("Generating documentation for JCL step '{}'", id);
            llm.complete(&prompts::jcl_step_prompt(id, step, context))
                .await
        }
        OuterNode::JclJob { job_name } => {
            let steps: Vec<String> = graphs
                .outer
                .successors(id)
                .filter(|s| graphs.outer.edge(id, s) == Some(&EdgeKind::ContainsStep))
                .map(str::to_string)
                .collect();
            tracing::info!("Generating documentation for JCL job '{}'", id);
            llm.complete(&prompts::jcl_job_prompt(job_name, &steps, context))
                .await
        }
    }
}

pub struct SelectNextNode;

#[async_trait]
impl WorkflowNode<ReverseState> for SelectNextNode {
    async fn run(&self, state: &mut ReverseState) -> Result<()> {
        state.current = state.queue.pop_front();
        match &state.current {
            Some(id) => tracing::info!("Selected next node for reverse processing: {}", id),
            None => tracing::info!("No more nodes to process in reverse order"),
        }
        Ok(())
    }
}

pub struct DocumentNode<L> {
    llm: Arc<L>,
}

impl<L> DocumentNode<L> {
    pub fn new(llm: Arc<L>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl<L: LlmClient + 'static> WorkflowNode<ReverseState> for DocumentNode<L> {
    async fn run(&self, state: &mut ReverseState) -> Result<()> {
        let Some(id) = state.current.clone() else {
            return Ok(());
        };

        let context = future_context(&state.graphs.outer, &id, &state.documentation);
        let doc = match document_outer_node(self.llm.as_ref(), &state.graphs, &id, &context).await
        {
            Ok(doc) => {
                tracing::info!("Successfully generated documentation for '{}'", id);
                doc
            }
            Err(e) => {
                tracing::error!("Error generating documentation for {}: {}", id, e);
                state.failed.push(id.clone());
                format!("Error generating documentation: {}", e)
            }
        };

        state.documentation.insert(id, doc);
        Ok(())
    }
}

pub fn build_reverse_workflow<L, St>(
    llm: Arc<L>,
    storage: Arc<St>,
) -> Result<CompiledWorkflow<ReverseState>>
where
    L: LlmClient + 'static,
    St: Storage + 'static,
{
    StateGraph::new("reverse_documentation")
        .add_node("select_next_node", SelectNextNode)
        .add_node("document_node", DocumentNode::new(llm))
        .add_node("save_documentation", SaveNode::new(storage))
        .add_edge(START, "select_next_node")
        .add_conditional_edges(
            "select_next_node",
            |state: &ReverseState| {
                if state.current.is_some() {
                    "document"
                } else {
                    "done"
                }
            },
            &[("document", "document_node"), ("done", "save_documentation")],
        )
        .add_edge("document_node", "select_next_node")
        .add_edge("save_documentation", END)
        .compile()
}

pub async fn run_reverse_documentation<L, St>(
    llm: Arc<L>,
    storage: Arc<St>,
    graphs: ProgramGraphs,
    recursion_limit: usize,
) -> Result<ReverseState>
where
    L: LlmClient + 'static,
    St: Storage + 'static,
{
    let workflow = build_reverse_workflow(llm, storage)?;
    let state = initialize_reverse_state(graphs);
    check_step_budget(workflow.name(), state.queue.len(), recursion_limit)?;
    let result = workflow.invoke(state, recursion_limit).await?;
    tracing::info!("Reverse documentation workflow completed successfully");
    Ok(result)
}
