use std::path::{Path, PathBuf};

use crate::error::{ClabError, Result};
use crate::models::LaunchSpec;

pub const STATE_FILE: &str = "launch-specs.json";

/// Launch specs handed to the runtime, persisted in the lab root.
pub struct LaunchSpecStore {
    state_file_path: PathBuf,
}

impl LaunchSpecStore {
    pub fn new(lab_root: &Path) -> Self {
        Self {
            state_file_path: lab_root.join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.state_file_path
    }

    /// Specs from the last provisioning run; empty when the lab was never provisioned.
    pub async fn load(&self) -> Result<Vec<LaunchSpec>> {
        let json = match tokio::fs::read_to_string(&self.state_file_path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ClabError::State(format!(
                    "failed to read {}: {e}",
                    self.state_file_path.display()
                )))
            }
        };
        Ok(serde_json::from_str(&json)?)
    }

    /// Replace the stored specs. Written to a sibling file first and renamed
    /// over the old one, so readers never observe a partial document.
    pub async fn save(&self, specs: &[LaunchSpec]) -> Result<()> {
        let json = serde_json::to_string_pretty(specs)?;
        let tmp = self.state_file_path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| ClabError::State(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.state_file_path)
            .await
            .map_err(|e| {
                ClabError::State(format!(
                    "failed to replace {}: {e}",
                    self.state_file_path.display()
                ))
            })?;
        tracing::debug!("saved {} launch specs", specs.len());
        Ok(())
    }
}
