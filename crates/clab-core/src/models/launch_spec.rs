use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A `(hostPath, containerPath)` mount pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bind {
    pub host_path: PathBuf,
    pub container_path: String,
}

impl Bind {
    pub fn new(host_path: impl Into<PathBuf>, container_path: &str) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.to_string(),
        }
    }
}

/// Rendered the way container runtimes take binds on the command line.
impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_path.display(), self.container_path)
    }
}

/// Everything the container runtime needs to create one node.
///
/// Binds keep insertion order; a later bind shadows an earlier one on the
/// same container path. Empty `entrypoint`/`cmd` mean "image default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpec {
    pub name: String,
    pub short_name: String,
    pub kind: String,
    pub image: String,
    pub group: String,
    pub position: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    pub binds: Vec<Bind>,
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub entrypoint: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cmd: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub config: String,
}

impl LaunchSpec {
    pub fn add_bind(&mut self, host_path: impl Into<PathBuf>, container_path: &str) {
        self.binds.push(Bind::new(host_path, container_path));
    }

    /// Insert every default whose key is not already set.
    pub fn merge_env_defaults<I>(&mut self, defaults: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in defaults {
            self.env.entry(key).or_insert(value);
        }
    }

    /// Binds in `host:container` form.
    pub fn bind_strings(&self) -> Vec<String> {
        self.binds.iter().map(ToString::to_string).collect()
    }
}
