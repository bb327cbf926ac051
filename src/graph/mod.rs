pub mod builder;
pub mod digraph;

use crate::domain::model::{EdgeKind, NodeKind, OuterNode, ParagraphNode};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub use builder::build_graphs;
pub use digraph::DiGraph;

/// Jobs, steps and programs with EXECUTES / CALL / CONTAINS_STEP edges.
pub type OuterGraph = DiGraph<OuterNode, EdgeKind>;
/// Paragraphs of one program with PERFORM / GOTO edges.
pub type InnerGraph = DiGraph<ParagraphNode, EdgeKind>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramGraphs {
    pub outer: OuterGraph,
    pub inner: BTreeMap<String, InnerGraph>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphSummary {
    pub outer_nodes: usize,
    pub outer_edges: usize,
    pub programs: usize,
    pub placeholders: usize,
    pub jcl_steps: usize,
    pub paragraphs: usize,
}

impl ProgramGraphs {
    pub fn load_cache<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save_cache<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    pub fn summary(&self) -> GraphSummary {
        let mut summary = GraphSummary {
            outer_nodes: self.outer.node_count(),
            outer_edges: self.outer.edge_count(),
            paragraphs: self.inner.values().map(InnerGraph::node_count).sum(),
            ..GraphSummary::default()
        };
        for (_, node) in self.outer.nodes() {
            match node {
                OuterNode::Program(program) if program.is_placeholder => {
                    summary.placeholders += 1
                }
                OuterNode::Program(_) => summary.programs += 1,
                OuterNode::JclStep(_) => summary.jcl_steps += 1,
                OuterNode::JclJob { .. } => {}
            }
        }
        summary
    }

    pub fn kind_of(&self, id: &str) -> Option<NodeKind> {
        self.outer.node(id).map(OuterNode::kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ProgramNode;
    use tempfile::TempDir;

    #[test]
    fn test_cache_roundtrip() {
        let mut graphs = ProgramGraphs::default();
        graphs
            .outer
            .add_node("PAYROLL", OuterNode::Program(ProgramNode::placeholder("test")));
        let mut inner = InnerGraph::new();
        inner.add_node(
            "PAYROLL:ENTRY",
            ParagraphNode {
                name: "ENTRY".to_string(),
                code_with_comments: "DISPLAY 'HI'.".to_string(),
                code_without_comments: "DISPLAY 'HI'.".to_string(),
            },
        );
        graphs.inner.insert("PAYROLL".to_string(), inner);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache/graphs.json");
        graphs.save_cache(&path).unwrap();

        let restored = ProgramGraphs::load_cache(&path).unwrap();
        assert_eq!(restored, graphs);
        assert_eq!(restored.summary().placeholders, 1);
        assert_eq!(restored.summary().paragraphs, 1);
    }

    #[test]
    fn test_load_cache_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graphs.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(ProgramGraphs::load_cache(&path).is_err());
    }
}
