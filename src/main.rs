use adk_agent::utils::error::{AgentError, ErrorSeverity};
use adk_agent::utils::{logger, validation, validation::Validate};
use adk_agent::{CliArgs, DocEngine, DocumentationPipeline, LocalStorage, OpenAiClient};
use clap::Parser;
use std::path::Path;

fn exit_code(e: &AgentError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 重試錯誤
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}

fn report_failure(stage: &str, e: &AgentError) -> i32 {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    exit_code(e)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(exit_code(&e));
        }
    };

    // 初始化日誌
    let log_file = config.logging.file.as_deref().map(Path::new);
    if config.logging.json {
        logger::init_json_logger(args.verbose, log_file)?;
    } else {
        logger::init_cli_logger(args.verbose, log_file)?;
    }

    tracing::info!("Starting adk-agent CLI");
    if args.verbose {
        tracing::debug!("Effective config: {:?}", config);
    }

    // 驗證配置
    let needs_llm = !(args.graphs_only || args.dry_run);
    let validated = config.validate().and_then(|()| {
        if needs_llm && config.llm.requires_api_key() {
            validation::validate_required_field("llm.api_key", &config.llm.api_key)?;
        }
        Ok(())
    });
    if let Err(e) = validated {
        std::process::exit(report_failure("Configuration validation", &e));
    }

    let llm = match OpenAiClient::new(&config.llm) {
        Ok(llm) => llm,
        Err(e) => std::process::exit(report_failure("LLM client setup", &e)),
    };

    let storage = LocalStorage::new(config.output.dir.clone());
    let engine = DocEngine::new(DocumentationPipeline::new(storage, config, llm));

    if args.graphs_only {
        match engine.graphs_only().await {
            Ok(summary) => {
                println!(
                    "✅ Graphs built: {} outer nodes, {} edges, {} paragraphs",
                    summary.outer_nodes, summary.outer_edges, summary.paragraphs
                );
            }
            Err(e) => std::process::exit(report_failure("Graph building", &e)),
        }
        return Ok(());
    }

    if args.dry_run {
        match engine.dry_run().await {
            Ok(order) => {
                println!("Processing order ({} components):", order.len());
                for (position, id) in order.iter().enumerate() {
                    println!("{:>4}. {}", position + 1, id);
                }
            }
            Err(e) => std::process::exit(report_failure("Dry run", &e)),
        }
        return Ok(());
    }

    match engine.run().await {
        Ok(report) => {
            tracing::info!("✅ Documentation completed successfully!");
            tracing::info!("📁 Output saved to: {}", report.output_dir);
            println!("✅ Documentation completed successfully!");
            println!(
                "📁 {} files written to {} ({} components failed)",
                report.written_files.len(),
                report.output_dir,
                report.failed_components
            );
        }
        Err(e) => {
            let code = report_failure("Documentation process", &e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
