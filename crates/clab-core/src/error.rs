use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ClabError {
    #[error("kind '{0}' is not supported")]
    UnsupportedKind(String),

    #[error("node={node}, failed to resolve config: {reason}")]
    ConfigResolution { node: String, reason: String },

    #[error("node={node}, failed to resolve license: {reason}")]
    LicenseResolution { node: String, reason: String },

    #[error("failed to render config {path}: {reason}")]
    ConfigRender { path: PathBuf, reason: String },

    #[error("file copy [src {src} -> dst {dst}] failed: {source}")]
    FileCopy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("topology file not found at {0}")]
    TopologyNotFound(PathBuf),

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("invalid publish entry: {0}")]
    InvalidPublish(String),

    #[error("container runtime operation failed: {0}")]
    Runtime(String),

    #[error("state persistence failed: {0}")]
    State(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ClabError>;
