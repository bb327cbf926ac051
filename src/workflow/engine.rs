use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;

pub const START: &str = "__start__";
pub const END: &str = "__end__";

/// One step of a workflow; mutates the shared state in place.
#[async_trait]
pub trait WorkflowNode<S: Send>: Send + Sync {
    async fn run(&self, state: &mut S) -> Result<()>;
}

type Router<S> = Box<dyn Fn(&S) -> &'static str + Send + Sync>;

enum Edge<S> {
    Fixed(String),
    Conditional {
        router: Router<S>,
        routes: HashMap<&'static str, String>,
    },
}

/// Builder for a workflow graph over a state type `S`.
pub struct StateGraph<S: Send> {
    name: String,
    nodes: HashMap<String, Box<dyn WorkflowNode<S>>>,
    edges: HashMap<String, Edge<S>>,
}

impl<S: Send + 'static> StateGraph<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
        }
    }

    pub fn add_node(mut self, name: &str, node: impl WorkflowNode<S> + 'static) -> Self {
        self.nodes.insert(name.to_string(), Box::new(node));
        self
    }

    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        self.edges
            .insert(from.to_string(), Edge::Fixed(to.to_string()));
        self
    }

    /// `router` returns a route key; `routes` maps each key to a node name or [`END`].
    pub fn add_conditional_edges<F>(
        mut self,
        from: &str,
        router: F,
        routes: &[(&'static str, &str)],
    ) -> Self
    where
        F: Fn(&S) -> &'static str + Send + Sync + 'static,
    {
        let routes = routes
            .iter()
            .map(|(key, target)| (*key, target.to_string()))
            .collect();
        self.edges.insert(
            from.to_string(),
            Edge::Conditional {
                router: Box::new(router),
                routes,
            },
        );
        self
    }

    pub fn compile(self) -> Result<CompiledWorkflow<S>> {
        let invalid = |message: String| AgentError::WorkflowError {
            node: self.name.clone(),
            message,
        };

        if !self.edges.contains_key(START) {
            return Err(invalid("no edge leaves START".to_string()));
        }

        for (from, edge) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(invalid(format!("edge from unknown node '{}'", from)));
            }
            let targets: Vec<&String> = match edge {
                Edge::Fixed(to) => vec![to],
                Edge::Conditional { routes, .. } => routes.values().collect(),
            };
            for to in targets {
                if to != END && !self.nodes.contains_key(to) {
                    return Err(invalid(format!("edge from '{}' to unknown node '{}'", from, to)));
                }
            }
        }

        for name in self.nodes.keys() {
            if !self.edges.contains_key(name) {
                return Err(invalid(format!("node '{}' has no outgoing edge", name)));
            }
        }

        Ok(CompiledWorkflow {
            name: self.name,
            nodes: self.nodes,
            edges: self.edges,
        })
    }
}

pub struct CompiledWorkflow<S: Send> {
    name: String,
    nodes: HashMap<String, Box<dyn WorkflowNode<S>>>,
    edges: HashMap<String, Edge<S>>,
}

impl<S: Send + 'static> CompiledWorkflow<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn next_after(&self, from: &str, state: &S) -> Result<String> {
        match self.edges.get(from) {
            Some(Edge::Fixed(to)) => Ok(to.clone()),
            Some(Edge::Conditional { router, routes }) => {
                let key = router(state);
                routes.get(key).cloned().ok_or_else(|| AgentError::WorkflowError {
                    node: from.to_string(),
                    message: format!("router returned unknown route '{}'", key),
                })
            }
            None => Err(AgentError::WorkflowError {
                node: from.to_string(),
                message: "no outgoing edge".to_string(),
            }),
        }
    }

    /// Runs the workflow from START until END, executing at most `recursion_limit` node steps.
    pub async fn invoke(&self, mut state: S, recursion_limit: usize) -> Result<S> {
        let mut current = self.next_after(START, &state)?;
        let mut steps = 0usize;

        while current != END {
            steps += 1;
            if steps > recursion_limit {
                return Err(AgentError::WorkflowError {
                    node: current,
                    message: format!(
                        "recursion limit of {} steps reached in workflow '{}'",
                        recursion_limit, self.name
                    ),
                });
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| AgentError::WorkflowError {
                    node: current.clone(),
                    message: "unknown node".to_string(),
                })?;
            tracing::trace!("Workflow {} step {}: {}", self.name, steps, current);
            node.run(&mut state).await?;
            current = self.next_after(&current, &state)?;
        }

        tracing::debug!("Workflow {} finished after {} steps", self.name, steps);
        Ok(state)
    }
}
