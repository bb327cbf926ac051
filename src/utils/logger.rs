use anyhow::Context;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// HTTP client internals are only interesting when they fail.
const QUIET_CRATES: &str = "reqwest=error,hyper=error,hyper_util=error,rustls=error";

fn default_filter(verbose: bool) -> EnvFilter {
    let directives = if verbose {
        format!("adk_agent=debug,info,{}", QUIET_CRATES)
    } else {
        format!("adk_agent=info,warn,{}", QUIET_CRATES)
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

/// Creates (or truncates) the log file, creating its directory first.
fn open_log_file(path: &Path) -> anyhow::Result<Mutex<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    Ok(Mutex::new(file))
}

/// Console logger, optionally mirrored into a log file that is truncated on every run.
pub fn init_cli_logger(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(open_log_file(path)?),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(console)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

/// JSON lines on stdout, for running under a log collector. The optional log
/// file receives the same JSON lines.
pub fn init_json_logger(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(open_log_file(path)?)
                .json(),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}
