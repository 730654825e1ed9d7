use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Management network addressing shared by every node of a lab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MgmtNet {
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub ipv4_subnet: String,
    #[serde(default)]
    pub ipv6_subnet: String,
}

/// A validated node as declared by the topology, with every field already
/// resolved through the defaults/kind/node precedence chain.
#[derive(Debug, Clone, Default)]
pub struct NodeDeclaration {
    pub kind: String,
    pub short_name: String,
    pub long_name: String,
    pub lab_dir: PathBuf,
    /// Declared custom config path, empty when none was declared.
    pub config: String,
    /// Declared license path, empty when none was declared.
    pub license: String,
    pub image: String,
    pub node_type: String,
    pub group: String,
    pub position: String,
    pub user: String,
    pub mgmt: MgmtNet,
    pub env: BTreeMap<String, String>,
    pub publish: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl NodeDeclaration {
    pub fn new(kind: &str, short_name: &str, lab_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: kind.to_string(),
            short_name: short_name.to_string(),
            long_name: short_name.to_string(),
            lab_dir: lab_dir.into(),
            ..Self::default()
        }
    }
}
