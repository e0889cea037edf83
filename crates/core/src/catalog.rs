//! Where a flow's scripts come from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::CoreError;

/// Default base directory holding one subdirectory per flow.
pub const DEFAULT_USE_CASES_DIR: &str = "UseCases";

/// Source of the ordered script list for a flow.
#[async_trait]
pub trait ScriptCatalog: Send + Sync {
    /// Script identifiers for `flow_name`, in execution order.
    async fn list_scripts(&self, flow_name: &str) -> Result<Vec<String>, CoreError>;

    /// Filesystem location of `script` within `flow_name`.
    fn script_path(&self, flow_name: &str, script: &str) -> PathBuf;
}

/// Catalog backed by `<base_dir>/<flow_name>/`.
///
/// Lists regular, non-hidden files sorted by name. Subdirectories (such as
/// a `venv`) are skipped.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    base_dir: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[async_trait]
impl ScriptCatalog for DirectoryCatalog {
    async fn list_scripts(&self, flow_name: &str) -> Result<Vec<String>, CoreError> {
        let dir = self.base_dir.join(flow_name);
        let unavailable = |reason: String| CoreError::FlowScriptsUnavailable {
            flow: flow_name.to_string(),
            reason,
        };

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| unavailable(format!("{}: {e}", dir.display())))?;

        let mut scripts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| unavailable(e.to_string()))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| unavailable(e.to_string()))?;
            if !file_type.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!(flow = %flow_name, "Skipping script with non UTF-8 name");
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            scripts.push(name);
        }

        scripts.sort();
        tracing::debug!(flow = %flow_name, count = scripts.len(), "Listed flow scripts");
        Ok(scripts)
    }

    fn script_path(&self, flow_name: &str, script: &str) -> PathBuf {
        self.base_dir.join(flow_name).join(script)
    }
}
