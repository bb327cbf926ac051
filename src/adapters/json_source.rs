use crate::domain::model::SourceBundle;
use crate::utils::error::{AgentError, Result};
use std::path::Path;

/// Reads and parses every JSON file matching `pattern` below `directory`.
///
/// Files that cannot be read or parsed are logged and skipped; only an
/// invalid glob pattern is an error.
pub fn load_json_files(directory: &Path, pattern: &str) -> Result<Vec<serde_json::Value>> {
    let search_path = directory.join(pattern);
    let search_path = search_path.to_string_lossy();

    let paths = glob::glob(&search_path).map_err(|e| AgentError::InvalidConfigValueError {
        field: "input pattern".to_string(),
        value: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut documents = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("Cannot access {}: {}", e.path().display(), e.error());
                continue;
            }
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Cannot read {}: {}", path.display(), e);
                continue;
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => documents.push(value),
            Err(e) => tracing::error!("Error decoding JSON from {}: {}", path.display(), e),
        }
    }

    tracing::debug!(
        "Loaded {} JSON documents from {}",
        documents.len(),
        search_path
    );
    Ok(documents)
}

/// Loads JCL and COBOL parser output from the input directory.
pub fn load_sources(input_dir: &Path, jcl_pattern: &str, cobol_pattern: &str) -> Result<SourceBundle> {
    Ok(SourceBundle {
        jcl: load_json_files(input_dir, jcl_pattern)?,
        cobol: load_json_files(input_dir, cobol_pattern)?,
    })
}
