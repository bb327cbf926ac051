use serde::{Deserialize, Serialize};
use std::fmt;

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// One paragraph of a COBOL program as emitted by the COBOL parser.
///
/// The parser writes one file per paragraph and repeats the program-level
/// divisions in every file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CobolParagraphRecord {
    pub program_id: String,
    #[serde(default = "empty_object")]
    pub identification_division: serde_json::Value,
    #[serde(default = "empty_object")]
    pub environment_division: serde_json::Value,
    #[serde(default = "empty_object")]
    pub data_division: serde_json::Value,
    pub procedure_division: ProcedureDivisionRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureDivisionRecord {
    #[serde(default)]
    pub using: Vec<String>,
    pub paragraph: ParagraphRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphRecord {
    pub paragraph_name: String,
    #[serde(default)]
    pub paragraph_order: Option<i64>,
    #[serde(default)]
    pub code_with_comments: String,
    #[serde(default)]
    pub code_without_comments: String,
    #[serde(default)]
    pub called_programs: Vec<String>,
    #[serde(default)]
    pub perform_targets: Vec<String>,
    #[serde(default)]
    pub goto_targets: Vec<String>,
}

/// One job step as emitted by the JCL parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JclJobRecord {
    pub job_name: String,
    pub step: JclStepRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JclStepRecord {
    pub step_name: String,
    #[serde(default)]
    pub step_number: Option<serde_json::Value>,
    pub program_id: String,
    #[serde(default)]
    pub datasets: Vec<serde_json::Value>,
    #[serde(default)]
    pub code_with_comments: String,
    #[serde(default)]
    pub code_without_comments: String,
}

/// Raw parser output as read from disk, before decoding.
#[derive(Debug, Clone, Default)]
pub struct SourceBundle {
    pub jcl: Vec<serde_json::Value>,
    pub cobol: Vec<serde_json::Value>,
}

impl SourceBundle {
    pub fn is_empty(&self) -> bool {
        self.jcl.is_empty() && self.cobol.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramNode {
    pub identification_division: serde_json::Value,
    pub environment_division: serde_json::Value,
    pub data_division: serde_json::Value,
    pub procedure_division_using: Vec<String>,
    pub code_with_comments: String,
    pub code_without_comments: String,
    pub has_inner_graph: bool,
    /// Referenced by a CALL or a JCL step but no parser output exists for it.
    pub is_placeholder: bool,
    pub note: Option<String>,
}

impl ProgramNode {
    pub fn placeholder(note: impl Into<String>) -> Self {
        Self {
            identification_division: empty_object(),
            environment_division: empty_object(),
            data_division: empty_object(),
            procedure_division_using: Vec::new(),
            code_with_comments: String::new(),
            code_without_comments: String::new(),
            has_inner_graph: false,
            is_placeholder: true,
            note: Some(note.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JclStepNode {
    pub job_name: String,
    pub step_name: String,
    pub step_number: Option<serde_json::Value>,
    pub program_id: String,
    pub datasets: Vec<serde_json::Value>,
    pub code_with_comments: String,
    pub code_without_comments: String,
}

/// Node of the outer graph: jobs, steps and programs of the whole system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OuterNode {
    Program(ProgramNode),
    JclJob { job_name: String },
    JclStep(JclStepNode),
}

impl OuterNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            OuterNode::Program(_) => NodeKind::Program,
            OuterNode::JclJob { .. } => NodeKind::JclJob,
            OuterNode::JclStep(_) => NodeKind::JclStep,
        }
    }

    pub fn as_program(&self) -> Option<&ProgramNode> {
        match self {
            OuterNode::Program(program) => Some(program),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Program,
    JclJob,
    JclStep,
    Paragraph,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Program => "program",
            NodeKind::JclJob => "jcl_job",
            NodeKind::JclStep => "jcl_step",
            NodeKind::Paragraph => "paragraph",
        };
        f.write_str(name)
    }
}

/// Node of a program's inner graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphNode {
    pub name: String,
    pub code_with_comments: String,
    pub code_without_comments: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Call,
    Executes,
    ContainsStep,
    Perform,
    Goto,
}

/// Identifier of a paragraph node inside its program's inner graph.
pub fn paragraph_id(program_id: &str, paragraph: &str) -> String {
    format!("{}:{}", program_id, paragraph)
}

/// Identifier of a JCL step node in the outer graph.
pub fn step_id(job_name: &str, step_name: &str) -> String {
    format!("{}:{}", job_name, step_name)
}

/// What a documentation run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub output_dir: String,
    pub written_files: Vec<String>,
    pub documented_components: usize,
    pub failed_components: usize,
}
