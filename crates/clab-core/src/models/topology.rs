use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node::MgmtNet;

/// The topology file as written by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyFile {
    pub name: String,
    #[serde(default)]
    pub mgmt: MgmtNet,
    pub topology: Topology,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub defaults: NodeDefinition,
    #[serde(default)]
    pub kinds: BTreeMap<String, NodeDefinition>,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeDefinition>,
}

/// Settings that may appear at node, kind, or defaults level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publish: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Topology {
    /// Kind of a node: node level first, then the topology-wide default.
    pub fn node_kind(&self, name: &str) -> Option<String> {
        let node = self.nodes.get(name)?;
        node.kind
            .clone()
            .or_else(|| self.defaults.kind.clone())
            .filter(|k| !k.is_empty())
    }

    /// Resolve a scalar field with node > kind > defaults precedence.
    /// Empty strings count as unset.
    pub fn node_field<F>(&self, name: &str, field: F) -> Option<String>
    where
        F: Fn(&NodeDefinition) -> Option<&String>,
    {
        let node = self.nodes.get(name)?;
        let kind = self
            .node_kind(name)
            .and_then(|k| self.kinds.get(&k));

        let pick = |def: &NodeDefinition| field(def).filter(|v| !v.is_empty()).cloned();

        pick(node)
            .or_else(|| kind.and_then(pick))
            .or_else(|| pick(&self.defaults))
    }

    /// Merge env maps: defaults, then kind, then node. Later levels win.
    pub fn node_env(&self, name: &str) -> BTreeMap<String, String> {
        self.merged_map(name, |d| &d.env)
    }

    pub fn node_labels(&self, name: &str) -> BTreeMap<String, String> {
        self.merged_map(name, |d| &d.labels)
    }

    /// Publish entries are not merged; the most specific non-empty list wins.
    pub fn node_publish(&self, name: &str) -> Vec<String> {
        let Some(node) = self.nodes.get(name) else {
            return Vec::new();
        };
        if !node.publish.is_empty() {
            return node.publish.clone();
        }
        self.node_kind(name)
            .and_then(|k| self.kinds.get(&k))
            .map(|k| k.publish.clone())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.defaults.publish.clone())
    }

    fn merged_map<F>(&self, name: &str, field: F) -> BTreeMap<String, String>
    where
        F: Fn(&NodeDefinition) -> &BTreeMap<String, String>,
    {
        let mut merged = field(&self.defaults).clone();
        if let Some(kind) = self.node_kind(name).and_then(|k| self.kinds.get(&k)) {
            merged.extend(field(kind).clone());
        }
        if let Some(node) = self.nodes.get(name) {
            merged.extend(field(node).clone());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> TopologyFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    const TOPO: &str = r#"
name: lab1
mgmt:
  ipv4_subnet: 172.20.20.0/24
topology:
  defaults:
    kind: crpd
    env:
      LEVEL: defaults
      ONLY_DEFAULTS: "1"
  kinds:
    crpd:
      image: crpd:latest
      license: /licenses/crpd.lic
      env:
        LEVEL: kind
    vr-sros:
      image: vrnetlab/vr-sros:21.2.R1
      type: sr-1s
  nodes:
    r1:
      license: /licenses/r1.lic
      env:
        LEVEL: node
    r2:
      kind: vr-sros
      group: core
"#;

    #[test]
    fn node_kind_falls_back_to_defaults() {
        let topo = parse(TOPO).topology;
        assert_eq!(topo.node_kind("r1").as_deref(), Some("crpd"));
        assert_eq!(topo.node_kind("r2").as_deref(), Some("vr-sros"));
        assert_eq!(topo.node_kind("missing"), None);
    }

    #[test]
    fn scalar_precedence_is_node_kind_defaults() {
        let topo = parse(TOPO).topology;
        assert_eq!(
            topo.node_field("r1", |d| d.license.as_ref()).as_deref(),
            Some("/licenses/r1.lic")
        );
        assert_eq!(
            topo.node_field("r1", |d| d.image.as_ref()).as_deref(),
            Some("crpd:latest")
        );
        assert_eq!(
            topo.node_field("r2", |d| d.node_type.as_ref()).as_deref(),
            Some("sr-1s")
        );
        assert_eq!(topo.node_field("r2", |d| d.license.as_ref()), None);
    }

    #[test]
    fn env_merges_with_node_winning() {
        let topo = parse(TOPO).topology;
        let env = topo.node_env("r1");
        assert_eq!(env["LEVEL"], "node");
        assert_eq!(env["ONLY_DEFAULTS"], "1");

        let env = topo.node_env("r2");
        assert_eq!(env["LEVEL"], "defaults");
    }
}
