//! Prompt templates for every kind of component the agent documents.
//!
//! Reverse prompts describe a component in terms of what runs *after* it;
//! forward prompts carry the documentation of the previously documented
//! component instead.

use crate::domain::model::{JclStepNode, ProgramNode};

fn or_default<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.trim().is_empty() {
        fallback
    } else {
        text
    }
}

fn step_number(step: &JclStepNode) -> String {
    match &step.step_number {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
        None => "N/A".to_string(),
    }
}

pub fn paragraph_prompt(
    program_id: &str,
    paragraph_name: &str,
    code: &str,
    system_context: &str,
    later_paragraphs: &str,
) -> String {
    format!(
        r#"You are documenting COBOL program '{program_id}' by walking its paragraphs in REVERSE order of execution.

Components of the system that run AFTER this program:
---
{system_context}
---

Current paragraph: '{paragraph_name}'
```cobol
{code}
```

Documentation already written for the paragraphs that run AFTER '{paragraph_name}':
---
{later}
---

Using the code, the later paragraphs and the later system components, describe the purpose and key actions of paragraph '{paragraph_name}'.
Explain how it prepares for the effects documented above. Answer in 3-5 sentences."#,
        system_context = or_default(system_context, "No subsequent system context provided."),
        code = or_default(code, "No code found for paragraph."),
        later = or_default(
            later_paragraphs,
            "None yet: this is the last paragraph in execution order."
        ),
    )
}

pub fn program_prompt(program_id: &str, program: &ProgramNode, system_context: &str) -> String {
    format!(
        r#"You are documenting COBOL program '{program_id}' of a legacy mainframe system.

Components of the system that run AFTER this program:
---
{system_context}
---

Identification Division: {identification}
Environment Division: {environment}
Data Division: {data}
Procedure Division USING: {using:?}
```cobol
{code}
```

Write a structured markdown summary covering:
1. The purpose and main function of the program in the system
2. How it feeds the components that run after it
3. Its key data processing logic"#,
        identification = program.identification_division,
        environment = program.environment_division,
        data = program.data_division,
        using = program.procedure_division_using,
        code = or_default(&program.code_with_comments, "N/A"),
    )
}

pub fn placeholder_prompt(program_id: &str, note: Option<&str>, system_context: &str) -> String {
    format!(
        r#"You are documenting program '{program_id}' of a legacy mainframe system.

Other components reference this program, but its source code is not part of the parsed input.
Note: {note}

Components of the system that run AFTER this program:
---
{system_context}
---

Write a short markdown summary covering:
1. What its name and its callers suggest about its purpose
2. How it relates to the components that run after it
3. A clear statement that this is placeholder documentation because the source is unavailable"#,
        note = note.unwrap_or("No additional information available"),
    )
}

pub fn jcl_step_prompt(step_id: &str, step: &JclStepNode, system_context: &str) -> String {
    format!(
        r#"You are documenting JCL step '{step_id}' of a legacy mainframe system.

Components of the system that run AFTER this step:
---
{system_context}
---

Parent JCL job: {job}
Step name: {name}
Step number: {number}
Program executed: {program}
```jcl
{code}
```

Write a structured markdown summary covering:
1. The purpose of the step in the job stream
2. How it relates to the components that run after it
3. The key operations and datasets it handles"#,
        job = step.job_name,
        name = step.step_name,
        number = step_number(step),
        program = step.program_id,
        code = or_default(&step.code_with_comments, "N/A"),
    )
}

pub fn jcl_job_prompt(job_name: &str, steps: &[String], system_context: &str) -> String {
    let step_list = if steps.is_empty() {
        "(no steps parsed)".to_string()
    } else {
        steps.join(", ")
    };
    format!(
        r#"You are documenting JCL job '{job_name}' of a legacy mainframe system.

The job runs these steps: {step_list}

Documentation of its steps and of the components they run:
---
{system_context}
---

Write a structured markdown summary of the job: its overall business purpose, the flow through its steps, and its main inputs and outputs."#
    )
}

/// What the forward workflow knows about the component it documents.
pub enum ForwardComponent<'a> {
    JclJob {
        job_name: &'a str,
        steps: &'a [String],
    },
    JclStep(&'a JclStepNode),
    Program(&'a ProgramNode),
    Paragraph {
        program_id: &'a str,
        name: &'a str,
        code: &'a str,
    },
}

impl ForwardComponent<'_> {
    fn kind(&self) -> &'static str {
        match self {
            ForwardComponent::JclJob { .. } => "jcl_job",
            ForwardComponent::JclStep(_) => "jcl_step",
            ForwardComponent::Program(_) => "program",
            ForwardComponent::Paragraph { .. } => "paragraph",
        }
    }

    fn details(&self) -> String {
        match self {
            ForwardComponent::JclJob { job_name, steps } => {
                format!("This is JCL job '{}' with steps: {}", job_name, steps.join(", "))
            }
            ForwardComponent::JclStep(step) => format!(
                r#"Parent JCL job: {job}
Step name: {name}
Step number: {number}
Datasets: {datasets}
Code (with comments):
```jcl
{with}
```
Code (without comments):
```jcl
{without}
```"#,
                job = step.job_name,
                name = step.step_name,
                number = step_number(step),
                datasets = serde_json::Value::Array(step.datasets.clone()),
                with = or_default(&step.code_with_comments, "N/A"),
                without = or_default(&step.code_without_comments, "N/A"),
            ),
            ForwardComponent::Program(program) if program.is_placeholder => format!(
                "This is a COBOL program whose source is not available.\nNote: {}",
                program.note.as_deref().unwrap_or("none")
            ),
            ForwardComponent::Program(program) => format!(
                r#"This is a COBOL program.
Identification Division: {identification}
Environment Division: {environment}
Data Division: {data}
Procedure Division USING: {using:?}
Full program code (all paragraphs):
```cobol
{with}
```
Code (without comments):
```cobol
{without}
```
Paragraph-level graph available: {inner}
Its paragraphs are documented separately."#,
                identification = program.identification_division,
                environment = program.environment_division,
                data = program.data_division,
                using = program.procedure_division_using,
                with = or_default(&program.code_with_comments, "N/A"),
                without = or_default(&program.code_without_comments, "N/A"),
                inner = program.has_inner_graph,
            ),
            ForwardComponent::Paragraph {
                program_id,
                name,
                code,
            } => format!(
                "This is COBOL paragraph '{}' of program '{}'.\n```cobol\n{}\n```",
                name,
                program_id,
                or_default(code, "N/A")
            ),
        }
    }
}

pub fn forward_prompt(
    component_id: &str,
    component: &ForwardComponent<'_>,
    previous_documentation: Option<&str>,
) -> String {
    format!(
        r#"You are a documentation agent working through a legacy system one component at a time.
Each component is a unit of executable code or a structural element.

Component ID: {component_id}
Component type: {kind}

Write a concise markdown summary of:
- what this component is (JCL job, JCL step, COBOL program, COBOL paragraph)
- its notable attributes and code
- its purpose in the program or in the wider system
- its connections (a step executes a program, a program calls a subprogram, a paragraph PERFORMs another)

Documentation of the previously documented component:
---
{previous}
---

Current component:
{details}

Keep it brief and easy to understand."#,
        kind = component.kind(),
        previous = previous_documentation
            .unwrap_or("This is the first component being documented."),
        details = component.details(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step() -> JclStepNode {
        JclStepNode {
            job_name: "PAYJOB".to_string(),
            step_name: "STEP01".to_string(),
            step_number: Some(json!(1)),
            program_id: "PAY01".to_string(),
            datasets: vec![json!({"dsn": "PROD.INPUT"})],
            code_with_comments: "//STEP01 EXEC PGM=PAY01".to_string(),
            code_without_comments: String::new(),
        }
    }

    #[test]
    fn test_paragraph_prompt_marks_last_paragraph() {
        let prompt = paragraph_prompt("PAY01", "FINISH", "STOP RUN.", "", "");
        assert!(prompt.contains("'FINISH'"));
        assert!(prompt.contains("STOP RUN."));
        assert!(prompt.contains("No subsequent system context provided."));
        assert!(prompt.contains("last paragraph in execution order"));
    }

    #[test]
    fn test_jcl_step_prompt_includes_step_details() {
        let prompt = jcl_step_prompt("PAYJOB:STEP01", &step(), "## Component: PAY01");
        assert!(prompt.contains("Parent JCL job: PAYJOB"));
        assert!(prompt.contains("Step number: 1"));
        assert!(prompt.contains("//STEP01 EXEC PGM=PAY01"));
        assert!(prompt.contains("## Component: PAY01"));
    }

    #[test]
    fn test_forward_prompt_uses_previous_documentation() {
        let node = step();
        let first = forward_prompt("PAYJOB:STEP01", &ForwardComponent::JclStep(&node), None);
        assert!(first.contains("This is the first component being documented."));
        assert!(first.contains("Component type: jcl_step"));
        assert!(first.contains("PROD.INPUT"));

        let next = forward_prompt(
            "PAYJOB:STEP01",
            &ForwardComponent::JclStep(&node),
            Some("Job PAYJOB runs payroll."),
        );
        assert!(next.contains("Job PAYJOB runs payroll."));
    }

    #[test]
    fn test_placeholder_prompt_mentions_missing_source() {
        let prompt = placeholder_prompt("DATEUTIL", Some("Called by program PAY01"), "ctx");
        assert!(prompt.contains("Called by program PAY01"));
        assert!(prompt.contains("placeholder documentation"));
    }
}
