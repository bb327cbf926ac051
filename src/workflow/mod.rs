pub mod engine;
pub mod forward;
pub mod reverse;

use crate::domain::ports::Storage;
use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use engine::WorkflowNode;
use std::collections::HashMap;
use std::sync::Arc;

pub use engine::{CompiledWorkflow, StateGraph, END, START};

/// Documentation per component id, in the order it was generated.
#[derive(Debug, Clone, Default)]
pub struct DocumentationSet {
    order: Vec<String>,
    docs: HashMap<String, String>,
}

impl DocumentationSet {
    pub fn insert(&mut self, id: impl Into<String>, documentation: String) {
        let id = id.into();
        if !self.docs.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.docs.insert(id, documentation);
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.docs.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .filter_map(|id| self.docs.get(id).map(|doc| (id.as_str(), doc.as_str())))
    }

    /// The `n` most recently generated entries, oldest first.
    pub fn last(&self, n: usize) -> impl Iterator<Item = (&str, &str)> {
        let skip = self.order.len().saturating_sub(n);
        self.iter().skip(skip)
    }
}

/// Steps a select/document/save workflow takes for `components` work items:
/// one select and one document per item, the final select, and the save.
pub fn required_steps(components: usize) -> usize {
    2 * components + 2
}

/// Fails before any LLM call when the workflow could not reach its save step.
pub(crate) fn check_step_budget(workflow: &str, components: usize, recursion_limit: usize) -> Result<()> {
    let needed = required_steps(components);
    if needed > recursion_limit {
        return Err(AgentError::WorkflowError {
            node: workflow.to_string(),
            message: format!(
                "{} components need {} steps but the recursion limit is {}",
                components, needed, recursion_limit
            ),
        });
    }
    Ok(())
}

/// File name for a component id: `:` and `/` become `_`.
pub fn doc_file_name(id: &str) -> String {
    format!("{}.md", id.replace([':', '/'], "_"))
}

/// State shared by the documentation workflows' save step.
pub trait DocumentationState: Send {
    fn documentation(&self) -> &DocumentationSet;
    fn record_written(&mut self, files: Vec<String>);
}

/// Writes every generated document through the storage; failures are logged per file.
pub struct SaveNode<St> {
    storage: Arc<St>,
}

impl<St> SaveNode<St> {
    pub fn new(storage: Arc<St>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<St, S> WorkflowNode<S> for SaveNode<St>
where
    St: Storage + 'static,
    S: DocumentationState + Sync,
{
    async fn run(&self, state: &mut S) -> Result<()> {
        let docs = state.documentation();
        tracing::info!(
            "Saving documentation for {} components to {}",
            docs.len(),
            self.storage.resolve("")
        );

        let mut written = Vec::new();
        for (id, content) in docs.iter() {
            let file_name = doc_file_name(id);
            match self.storage.write_file(&file_name, content.as_bytes()).await {
                Ok(()) => {
                    tracing::debug!("Saved documentation for {} to {}", id, file_name);
                    written.push(file_name);
                }
                Err(e) => tracing::error!("Error saving documentation for {}: {}", id, e),
            }
        }

        state.record_written(written);
        Ok(())
    }
}
