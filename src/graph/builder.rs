use crate::domain::model::{
    paragraph_id, step_id, CobolParagraphRecord, EdgeKind, JclJobRecord, JclStepNode, OuterNode,
    ParagraphNode, ParagraphRecord, ProgramNode,
};
use crate::graph::{InnerGraph, OuterGraph, ProgramGraphs};
use crate::utils::error::Result;
use std::collections::{BTreeSet, HashMap};

const ENTRY_PARAGRAPH: &str = "ENTRY";

/// Paragraph files of one program, merged.
struct ProgramSource {
    program_id: String,
    identification_division: serde_json::Value,
    environment_division: serde_json::Value,
    data_division: serde_json::Value,
    using: Vec<String>,
    paragraphs: Vec<ParagraphRecord>,
}

impl ProgramSource {
    fn from_record(record: CobolParagraphRecord) -> Self {
        Self {
            program_id: record.program_id,
            identification_division: record.identification_division,
            environment_division: record.environment_division,
            data_division: record.data_division,
            using: record.procedure_division.using,
            paragraphs: vec![record.procedure_division.paragraph],
        }
    }

    fn add_paragraph(&mut self, paragraph: ParagraphRecord) {
        match self
            .paragraphs
            .iter_mut()
            .find(|p| p.paragraph_name == paragraph.paragraph_name)
        {
            Some(existing) => *existing = paragraph,
            None => self.paragraphs.push(paragraph),
        }
    }

    /// Paragraphs in source order; paragraphs without an order go last.
    fn ordered_paragraphs(&self) -> Vec<&ParagraphRecord> {
        let mut ordered: Vec<&ParagraphRecord> = self.paragraphs.iter().collect();
        ordered.sort_by_key(|p| p.paragraph_order.unwrap_or(i64::MAX));
        ordered
    }
}

fn group_programs(cobol_json: &[serde_json::Value]) -> Vec<ProgramSource> {
    let mut programs: Vec<ProgramSource> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for value in cobol_json {
        let record: CobolParagraphRecord = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping COBOL record that does not match the parser schema: {}", e);
                continue;
            }
        };

        match index.get(&record.program_id) {
            Some(&i) => programs[i].add_paragraph(record.procedure_division.paragraph),
            None => {
                index.insert(record.program_id.clone(), programs.len());
                programs.push(ProgramSource::from_record(record));
            }
        }
    }

    programs
}

/// Builds the outer graph and one inner graph per COBOL program.
///
/// Inner graphs have unreachable paragraphs removed and are acyclic.
pub fn build_graphs(
    jcl_json: &[serde_json::Value],
    cobol_json: &[serde_json::Value],
) -> Result<ProgramGraphs> {
    tracing::info!(
        "Building graphs from {} COBOL paragraph records and {} JCL records",
        cobol_json.len(),
        jcl_json.len()
    );

    let mut graphs = ProgramGraphs::default();
    let programs = group_programs(cobol_json);

    for program in &programs {
        tracing::info!("Processing COBOL program: {}", program.program_id);
        let (code_with_comments, code_without_comments) = aggregate_code(program);

        graphs.outer.add_node(
            program.program_id.clone(),
            OuterNode::Program(ProgramNode {
                identification_division: program.identification_division.clone(),
                environment_division: program.environment_division.clone(),
                data_division: program.data_division.clone(),
                procedure_division_using: program.using.clone(),
                code_with_comments,
                code_without_comments,
                has_inner_graph: !program.paragraphs.is_empty(),
                is_placeholder: false,
                note: None,
            }),
        );

        let inner = build_inner_graph(program)?;
        graphs.inner.insert(program.program_id.clone(), inner);
    }

    // Callee nodes are only added once every parsed program exists, so a
    // placeholder never shadows a real program.
    for program in &programs {
        let callees: BTreeSet<&str> = program
            .paragraphs
            .iter()
            .flat_map(|p| p.called_programs.iter().map(String::as_str))
            .collect();
        if !callees.is_empty() {
            tracing::debug!(
                "Program {} calls {} other programs: {:?}",
                program.program_id,
                callees.len(),
                callees
            );
        }
        for callee in callees {
            ensure_program(
                &mut graphs.outer,
                callee,
                format!("Called by program {} but no parser output was found for it", program.program_id),
            );
            graphs
                .outer
                .add_edge(&program.program_id, callee, EdgeKind::Call)?;
        }
    }

    add_jcl_steps(&mut graphs.outer, jcl_json)?;

    tracing::info!(
        "Graph building completed. Outer graph has {} nodes and {} edges",
        graphs.outer.node_count(),
        graphs.outer.edge_count()
    );
    tracing::info!("Built inner graphs for {} programs", graphs.inner.len());

    Ok(graphs)
}

fn aggregate_code(program: &ProgramSource) -> (String, String) {
    let mut with_comments = String::new();
    let mut without_comments = String::new();

    for paragraph in program.ordered_paragraphs() {
        with_comments.push_str(&format!(
            "\n\n* --- PARAGRAPH: {} ---\n",
            paragraph.paragraph_name
        ));
        with_comments.push_str(&paragraph.code_with_comments);
        without_comments.push('\n');
        without_comments.push_str(&paragraph.code_without_comments);
    }

    (
        with_comments.trim().to_string(),
        without_comments.trim().to_string(),
    )
}

fn build_inner_graph(program: &ProgramSource) -> Result<InnerGraph> {
    let program_id = program.program_id.as_str();
    let mut inner = InnerGraph::new();
    tracing::debug!(
        "Found {} paragraphs in program {}",
        program.paragraphs.len(),
        program_id
    );

    for paragraph in program.ordered_paragraphs() {
        inner.add_node(
            paragraph_id(program_id, &paragraph.paragraph_name),
            ParagraphNode {
                name: paragraph.paragraph_name.clone(),
                code_with_comments: paragraph.code_with_comments.clone(),
                code_without_comments: paragraph.code_without_comments.clone(),
            },
        );
    }

    for paragraph in program.ordered_paragraphs() {
        let source = paragraph_id(program_id, &paragraph.paragraph_name);
        let targets = paragraph
            .perform_targets
            .iter()
            .map(|t| (t, EdgeKind::Perform))
            .chain(paragraph.goto_targets.iter().map(|t| (t, EdgeKind::Goto)));

        for (target, kind) in targets {
            let target_id = paragraph_id(program_id, target);
            if inner.contains_node(&target_id) {
                inner.add_edge(&source, &target_id, kind)?;
            } else {
                tracing::warn!(
                    "{:?} target {} not found in program {}",
                    kind,
                    target_id,
                    program_id
                );
            }
        }
    }

    remove_dead_paragraphs(&mut inner, program_id);
    break_cycles(&mut inner, program_id);

    Ok(inner)
}

/// Drops every paragraph the ENTRY paragraph cannot reach.
fn remove_dead_paragraphs(inner: &mut InnerGraph, program_id: &str) {
    let entry = paragraph_id(program_id, ENTRY_PARAGRAPH);
    if !inner.contains_node(&entry) {
        tracing::warn!(
            "ENTRY paragraph not found for program {}. Skipping dead code removal",
            program_id
        );
        return;
    }

    let live = inner.reachable_from(&entry);
    let dead: Vec<String> = inner
        .node_ids()
        .filter(|id| !live.contains(*id))
        .map(str::to_string)
        .collect();
    for id in &dead {
        inner.remove_node(id);
    }
    if !dead.is_empty() {
        tracing::debug!(
            "Removed {} dead paragraphs from program {}: {:?}",
            dead.len(),
            program_id,
            dead
        );
    }
}

/// Removes the back edges of a depth-first walk from ENTRY so the graph becomes a DAG.
fn break_cycles(inner: &mut InnerGraph, program_id: &str) {
    let entry = paragraph_id(program_id, ENTRY_PARAGRAPH);
    let removed = inner.back_edges(Some(&entry));
    for (u, v) in &removed {
        inner.remove_edge(u, v);
    }
    if !removed.is_empty() {
        tracing::debug!(
            "Removed {} edges to break cycles in program {}: {:?}",
            removed.len(),
            program_id,
            removed
        );
    }
}

fn ensure_program(outer: &mut OuterGraph, program_id: &str, note: String) {
    if !outer.contains_node(program_id) {
        tracing::debug!("Adding placeholder node for program {}", program_id);
        outer.add_node(program_id, OuterNode::Program(ProgramNode::placeholder(note)));
    }
}

fn add_jcl_steps(outer: &mut OuterGraph, jcl_json: &[serde_json::Value]) -> Result<()> {
    for value in jcl_json {
        let job: JclJobRecord = match serde_json::from_value(value.clone()) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!("Skipping JCL record without a usable jobName/step: {}", e);
                continue;
            }
        };

        let job_name = job.job_name;
        let step = job.step;
        let step_node_id = step_id(&job_name, &step.step_name);
        tracing::info!("Processing JCL job step: {}", step_node_id);

        if !outer.contains_node(&job_name) {
            outer.add_node(
                job_name.clone(),
                OuterNode::JclJob {
                    job_name: job_name.clone(),
                },
            );
            tracing::debug!("Added JCL job node: {}", job_name);
        }

        outer.add_node(
            step_node_id.clone(),
            OuterNode::JclStep(JclStepNode {
                job_name: job_name.clone(),
                step_name: step.step_name,
                step_number: step.step_number,
                program_id: step.program_id.clone(),
                datasets: step.datasets,
                code_with_comments: step.code_with_comments,
                code_without_comments: step.code_without_comments,
            }),
        );
        outer.add_edge(&job_name, &step_node_id, EdgeKind::ContainsStep)?;

        ensure_program(
            outer,
            &step.program_id,
            format!("Executed by JCL step {} but no parser output was found for it", step_node_id),
        );
        outer.add_edge(&step_node_id, &step.program_id, EdgeKind::Executes)?;
    }
    Ok(())
}
