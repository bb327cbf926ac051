use adk_agent::{AgentConfig, DocEngine, DocumentationPipeline, LocalStorage, OpenAiClient};
use httpmock::prelude::*;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn write_json(dir: &Path, relative: &str, value: serde_json::Value) {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

fn cobol_paragraph(program: &str, name: &str, order: i64, performs: &[&str], calls: &[&str]) -> serde_json::Value {
    json!({
        "program_id": program,
        "identification_division": {"program_id": program},
        "procedure_division": {
            "using": [],
            "paragraph": {
                "paragraph_name": name,
                "paragraph_order": order,
                "code_with_comments": format!("      * {}\n           CONTINUE.", name),
                "code_without_comments": "CONTINUE.",
                "called_programs": calls,
                "perform_targets": performs,
                "goto_targets": []
            }
        }
    })
}

/// A small payroll system: one job, two steps, one program calling a missing subprogram.
fn write_test_data(input: &Path) {
    write_json(
        input,
        "jcl/payjob_step01.json",
        json!({
            "jobName": "PAYJOB",
            "step": {
                "stepName": "STEP01",
                "stepNumber": 1,
                "programId": "PAY01",
                "datasets": [{"ddName": "PAYIN", "dsn": "PROD.PAY.INPUT"}],
                "codeWithComments": "//STEP01 EXEC PGM=PAY01",
                "codeWithoutComments": "//STEP01 EXEC PGM=PAY01"
            }
        }),
    );
    write_json(
        input,
        "jcl/payjob_step02.json",
        json!({
            "jobName": "PAYJOB",
            "step": {"stepName": "STEP02", "stepNumber": 2, "programId": "IEBGENER"}
        }),
    );
    write_json(input, "cobol/PAY01/entry.json", cobol_paragraph("PAY01", "ENTRY", 1, &["CALC-PAY"], &[]));
    write_json(input, "cobol/PAY01/calc.json", cobol_paragraph("PAY01", "CALC-PAY", 2, &[], &["TAXCALC"]));
    write_json(input, "cobol/PAY01/unused.json", cobol_paragraph("PAY01", "OLD-CODE", 3, &[], &[]));
}

fn config_toml(input: &Path, output: &Path, base_url: &str, mode: &str) -> String {
    format!(
        r#"
[input]
dir = "{input}"

[output]
dir = "{output}"

[llm]
base_url = "{base_url}"
model = "test-model"
api_key = "test-key"
max_retries = 0
retry_delay_ms = 1

[workflow]
mode = "{mode}"
"#,
        input = input.display(),
        output = output.display(),
    )
}

#[tokio::test]
async fn test_end_to_end_reverse_documentation() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("test_data");
    let output = temp_dir.path().join("docs");
    write_test_data(&input);

    let server = MockServer::start_async().await;
    let llm_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer test-key");
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "Generated summary."}}]
            }));
        })
        .await;

    let config =
        AgentConfig::from_toml_str(&config_toml(&input, &output, &server.base_url(), "reverse"))
            .unwrap();
    let llm = OpenAiClient::new(&config.llm).unwrap();
    let storage = LocalStorage::new(output.to_string_lossy().to_string());
    let engine = DocEngine::new(DocumentationPipeline::new(storage, config, llm));

    let report = engine.run().await.unwrap();

    // TAXCALC, IEBGENER (placeholders), PAY01, both steps and the job.
    assert_eq!(report.documented_components, 6);
    assert_eq!(report.failed_components, 0);
    // Placeholders, two live paragraphs of PAY01, two steps, one job.
    llm_mock.assert_hits_async(7).await;

    for file in [
        "PAY01.md",
        "TAXCALC.md",
        "IEBGENER.md",
        "PAYJOB.md",
        "PAYJOB_STEP01.md",
        "PAYJOB_STEP02.md",
        "index.md",
    ] {
        assert!(output.join(file).exists(), "missing {}", file);
    }

    let program_doc = std::fs::read_to_string(output.join("PAY01.md")).unwrap();
    assert!(program_doc.starts_with("# Documentation for COBOL Program: PAY01"));
    assert!(program_doc.contains("### Paragraph: ENTRY\nGenerated summary."));
    assert!(program_doc.contains("### Paragraph: CALC-PAY\nGenerated summary."));
    // Unreachable from ENTRY, so never documented.
    assert!(!program_doc.contains("OLD-CODE"));

    let index = std::fs::read_to_string(output.join("index.md")).unwrap();
    assert!(index.contains("- [PAYJOB](PAYJOB.md)"));
    assert!(!index.contains("Failed Components"));
}

#[tokio::test]
async fn test_llm_outage_is_recorded_per_component() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("test_data");
    let output = temp_dir.path().join("docs");
    write_test_data(&input);

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(503).body("overloaded");
        })
        .await;

    let config =
        AgentConfig::from_toml_str(&config_toml(&input, &output, &server.base_url(), "forward"))
            .unwrap();
    let llm = OpenAiClient::new(&config.llm).unwrap();
    let storage = LocalStorage::new(output.to_string_lossy().to_string());
    let engine = DocEngine::new(DocumentationPipeline::new(storage, config, llm));

    let report = engine.run().await.unwrap();

    // Six outer components plus the two live PAY01 paragraphs.
    assert_eq!(report.documented_components, 8);
    assert_eq!(report.failed_components, 8);

    let step_doc = std::fs::read_to_string(output.join("PAYJOB_STEP01.md")).unwrap();
    assert!(step_doc.starts_with("Error generating documentation:"));
    let index = std::fs::read_to_string(output.join("index.md")).unwrap();
    assert!(index.contains("## Failed Components"));
    assert!(index.contains("(forward mode)"));
}

#[tokio::test]
async fn test_dry_run_never_calls_the_llm() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("test_data");
    let output = temp_dir.path().join("docs");
    write_test_data(&input);

    let server = MockServer::start_async().await;
    let llm_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200);
        })
        .await;

    let config =
        AgentConfig::from_toml_str(&config_toml(&input, &output, &server.base_url(), "reverse"))
            .unwrap();
    let llm = OpenAiClient::new(&config.llm).unwrap();
    let storage = LocalStorage::new(output.to_string_lossy().to_string());
    let engine = DocEngine::new(DocumentationPipeline::new(storage, config, llm));

    let order = engine.dry_run().await.unwrap();
    assert_eq!(order.first().map(String::as_str), Some("TAXCALC"));
    assert_eq!(order.last().map(String::as_str), Some("PAYJOB"));
    assert_eq!(order.len(), 6);

    let summary = engine.graphs_only().await.unwrap();
    assert_eq!(summary.placeholders, 2);
    assert_eq!(summary.jcl_steps, 2);
    assert_eq!(summary.paragraphs, 2);

    llm_mock.assert_hits_async(0).await;
    assert!(!output.exists());
}
