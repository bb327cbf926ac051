use crate::utils::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OutEdge<E> {
    target: String,
    weight: E,
}

/// Directed graph keyed by string ids.
///
/// Nodes and each node's outgoing edges keep their insertion order, so every
/// traversal (and therefore every generated document order) is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiGraph<N, E> {
    order: Vec<String>,
    nodes: HashMap<String, N>,
    outgoing: HashMap<String, Vec<OutEdge<E>>>,
    incoming: HashMap<String, Vec<String>>,
}

impl<N, E> Default for DiGraph<N, E> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            nodes: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }
}

impl<N, E> DiGraph<N, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, or replaces the weight of an existing one in place.
    pub fn add_node(&mut self, id: impl Into<String>, weight: N) {
        let id = id.into();
        if !self.nodes.contains_key(&id) {
            self.order.push(id.clone());
            self.outgoing.insert(id.clone(), Vec::new());
            self.incoming.insert(id.clone(), Vec::new());
        }
        self.nodes.insert(id, weight);
    }

    pub fn node(&self, id: &str) -> Option<&N> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut N> {
        self.nodes.get_mut(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Adds `source -> target`. Both endpoints must exist; an existing edge gets the new weight.
    pub fn add_edge(&mut self, source: &str, target: &str, weight: E) -> Result<()> {
        for endpoint in [source, target] {
            if !self.contains_node(endpoint) {
                return Err(AgentError::GraphError {
                    message: format!(
                        "cannot add edge {} -> {}: unknown node {}",
                        source, target, endpoint
                    ),
                });
            }
        }

        let edges = self.outgoing.entry(source.to_string()).or_default();
        if let Some(existing) = edges.iter_mut().find(|e| e.target == target) {
            existing.weight = weight;
            return Ok(());
        }
        edges.push(OutEdge {
            target: target.to_string(),
            weight,
        });
        self.incoming
            .entry(target.to_string())
            .or_default()
            .push(source.to_string());
        Ok(())
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.outgoing
            .get(source)
            .map(|edges| edges.iter().any(|e| e.target == target))
            .unwrap_or(false)
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&E> {
        self.outgoing
            .get(source)?
            .iter()
            .find(|e| e.target == target)
            .map(|e| &e.weight)
    }

    /// Returns the removed weight, or `None` when the edge does not exist.
    pub fn remove_edge(&mut self, source: &str, target: &str) -> Option<E> {
        let edges = self.outgoing.get_mut(source)?;
        let position = edges.iter().position(|e| e.target == target)?;
        let removed = edges.remove(position);
        if let Some(preds) = self.incoming.get_mut(target) {
            if let Some(p) = preds.iter().position(|p| p.as_str() == source) {
                preds.remove(p);
            }
        }
        Some(removed.weight)
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<N> {
        let weight = self.nodes.remove(id)?;
        self.order.retain(|n| n.as_str() != id);

        for edge in self.outgoing.remove(id).unwrap_or_default() {
            if let Some(preds) = self.incoming.get_mut(&edge.target) {
                preds.retain(|p| p.as_str() != id);
            }
        }
        for pred in self.incoming.remove(id).unwrap_or_default() {
            if let Some(edges) = self.outgoing.get_mut(&pred) {
                edges.retain(|e| e.target != id);
            }
        }
        Some(weight)
    }

    pub fn node_ids(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = (&str, &N)> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|n| (id.as_str(), n)))
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &E)> {
        self.order.iter().flat_map(move |source| {
            self.outgoing
                .get(source)
                .into_iter()
                .flatten()
                .map(move |e| (source.as_str(), e.target.as_str(), &e.weight))
        })
    }

    pub fn successors(&self, id: &str) -> impl Iterator<Item = &str> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .map(|e| e.target.as_str())
    }

    pub fn predecessors(&self, id: &str) -> impl Iterator<Item = &str> {
        self.incoming
            .get(id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.incoming.get(id).map(Vec::len).unwrap_or(0)
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.outgoing.get(id).map(Vec::len).unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(Vec::len).sum()
    }

    /// Every node reachable from `start`, `start` included.
    pub fn reachable_from(&self, start: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        if !self.contains_node(start) {
            return seen;
        }
        let mut queue = VecDeque::from([start.to_string()]);
        seen.insert(start.to_string());
        while let Some(current) = queue.pop_front() {
            for next in self.successors(&current) {
                if seen.insert(next.to_string()) {
                    queue.push_back(next.to_string());
                }
            }
        }
        seen
    }

    /// A node always has a path to itself.
    pub fn has_path(&self, source: &str, target: &str) -> bool {
        if !self.contains_node(source) || !self.contains_node(target) {
            return false;
        }
        if source == target {
            return true;
        }
        let mut seen = HashSet::from([source]);
        let mut queue = VecDeque::from([source]);
        while let Some(current) = queue.pop_front() {
            for next in self.successors(current) {
                if next == target {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Edges closing a cycle in a depth-first walk that starts at `start`
    /// (when present) and then at every unvisited node in insertion order.
    /// Removing all of them leaves the graph acyclic.
    pub fn back_edges(&self, start: Option<&str>) -> Vec<(String, String)> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = self
            .order
            .iter()
            .map(|id| (id.as_str(), Mark::New))
            .collect();
        let roots = start
            .filter(|s| self.contains_node(s))
            .into_iter()
            .chain(self.order.iter().map(String::as_str));

        let mut found = Vec::new();
        for root in roots {
            if marks.get(root).copied() != Some(Mark::New) {
                continue;
            }
            marks.insert(root, Mark::Active);
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];

            while let Some((node, index)) = stack.pop() {
                let edges = self.outgoing.get(node).map(Vec::as_slice).unwrap_or(&[]);
                if index < edges.len() {
                    stack.push((node, index + 1));
                    let target = edges[index].target.as_str();
                    match marks.get(target).copied() {
                        Some(Mark::New) => {
                            marks.insert(target, Mark::Active);
                            stack.push((target, 0));
                        }
                        Some(Mark::Active) => found.push((node.to_string(), target.to_string())),
                        _ => {}
                    }
                } else {
                    marks.insert(node, Mark::Done);
                }
            }
        }
        found
    }

    /// Kahn's algorithm; ties are broken by insertion order.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        let mut remaining: HashMap<&str, usize> = self
            .order
            .iter()
            .map(|id| (id.as_str(), self.in_degree(id)))
            .collect();
        let mut ready: VecDeque<&str> = self
            .order
            .iter()
            .map(String::as_str)
            .filter(|id| remaining[id] == 0)
            .collect();

        let mut sorted = Vec::with_capacity(self.order.len());
        while let Some(id) = ready.pop_front() {
            sorted.push(id.to_string());
            for next in self.successors(id) {
                if let Some(count) = remaining.get_mut(next) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(next);
                    }
                }
            }
        }

        if sorted.len() < self.order.len() {
            let stuck = self
                .order
                .iter()
                .find(|id| remaining[id.as_str()] > 0)
                .cloned()
                .unwrap_or_default();
            return Err(AgentError::GraphError {
                message: format!("graph contains a cycle through {}", stuck),
            });
        }
        Ok(sorted)
    }

    pub fn is_acyclic(&self) -> bool {
        self.topological_sort().is_ok()
    }
}
