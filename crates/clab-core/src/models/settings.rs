use std::path::PathBuf;

pub const DEFAULT_TEMPLATES_DIR: &str = "/etc/containerlab/templates";
pub const TEMPLATES_DIR_ENV: &str = "CLAB_TEMPLATES_DIR";

/// Process-wide settings. Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root holding default config templates and kind support files.
    pub templates_dir: PathBuf,
}

impl Settings {
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }

    /// `CLAB_TEMPLATES_DIR` when set and non-empty, else the packaged location.
    pub fn from_env() -> Self {
        let dir = std::env::var(TEMPLATES_DIR_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TEMPLATES_DIR.to_string());
        Self::new(dir)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATES_DIR)
    }
}
