use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ClabError, Result};
use crate::models::{NodeDeclaration, NodeDefinition, TopologyFile};
use crate::services::provisioner::NodeLookup;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").unwrap());

/// A parsed topology together with the directory it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedTopology {
    pub file: TopologyFile,
    pub path: PathBuf,
    pub base_dir: PathBuf,
}

pub fn load(path: &Path) -> Result<LoadedTopology> {
    if !path.exists() {
        return Err(ClabError::TopologyNotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    let file: TopologyFile = serde_yaml::from_str(&contents)
        .map_err(|e| ClabError::InvalidTopology(e.to_string()))?;
    validate(&file)?;

    let path = std::path::absolute(path)?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));
    Ok(LoadedTopology {
        file,
        path,
        base_dir,
    })
}

fn validate(file: &TopologyFile) -> Result<()> {
    if !NAME_RE.is_match(&file.name) {
        return Err(ClabError::InvalidTopology(format!(
            "lab name '{}' is empty or contains invalid characters",
            file.name
        )));
    }
    if file.topology.nodes.is_empty() {
        return Err(ClabError::InvalidTopology(
            "topology must declare at least one node".into(),
        ));
    }
    for name in file.topology.nodes.keys() {
        if !NAME_RE.is_match(name) {
            return Err(ClabError::InvalidTopology(format!(
                "node name '{name}' contains invalid characters"
            )));
        }
        if file.topology.node_kind(name).is_none() {
            return Err(ClabError::InvalidTopology(format!(
                "node '{name}' has no kind"
            )));
        }
    }
    Ok(())
}

impl LoadedTopology {
    pub fn name(&self) -> &str {
        &self.file.name
    }

    /// `<topology dir>/clab-<name>`: parent of every node's lab directory.
    pub fn lab_root(&self) -> PathBuf {
        self.base_dir.join(format!("clab-{}", self.file.name))
    }

    pub fn node_lab_dir(&self, short_name: &str) -> PathBuf {
        self.lab_root().join(short_name)
    }

    pub fn long_name(&self, short_name: &str) -> String {
        format!("clab-{}-{}", self.file.name, short_name)
    }

    /// One declaration per node, in node-name order.
    pub fn declarations(&self) -> Vec<NodeDeclaration> {
        let topo = &self.file.topology;
        topo.nodes
            .keys()
            .map(|name| {
                let field = |f: fn(&NodeDefinition) -> Option<&String>| {
                    topo.node_field(name, f).unwrap_or_default()
                };
                NodeDeclaration {
                    kind: topo.node_kind(name).unwrap_or_default(),
                    short_name: name.clone(),
                    long_name: self.long_name(name),
                    lab_dir: self.node_lab_dir(name),
                    config: field(|d| d.config.as_ref()),
                    license: field(|d| d.license.as_ref()),
                    image: field(|d| d.image.as_ref()),
                    node_type: field(|d| d.node_type.as_ref()),
                    group: field(|d| d.group.as_ref()),
                    position: field(|d| d.position.as_ref()),
                    user: field(|d| d.user.as_ref()),
                    mgmt: self.file.mgmt.clone(),
                    env: topo.node_env(name),
                    publish: topo.node_publish(name),
                    labels: topo.node_labels(name),
                }
            })
            .collect()
    }

    /// Expand `~` and anchor relative paths at the topology directory.
    /// The resolved file must exist.
    fn resolve_path(&self, raw: &str) -> Result<String> {
        let expanded = if raw == "~" || raw.starts_with("~/") {
            let home = std::env::var("HOME").map_err(|_| {
                ClabError::InvalidTopology(format!("cannot expand {raw}: HOME is not set"))
            })?;
            PathBuf::from(home).join(raw.trim_start_matches('~').trim_start_matches('/'))
        } else {
            PathBuf::from(raw)
        };
        let resolved = if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        };
        if !resolved.is_file() {
            return Err(ClabError::InvalidTopology(format!(
                "file {} does not exist",
                resolved.display()
            )));
        }
        Ok(resolved.to_string_lossy().into_owned())
    }

    fn lookup_path<F>(&self, short_name: &str, field: F) -> Result<String>
    where
        F: Fn(&NodeDefinition) -> Option<&String>,
    {
        match self.file.topology.node_field(short_name, field) {
            Some(raw) => self.resolve_path(&raw),
            None => Ok(String::new()),
        }
    }
}

impl NodeLookup for LoadedTopology {
    fn node_config(&self, short_name: &str) -> Result<String> {
        self.lookup_path(short_name, |d| d.config.as_ref())
    }

    fn node_license(&self, short_name: &str) -> Result<String> {
        self.lookup_path(short_name, |d| d.license.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TOPO_FILE: &str = "lab1.clab.yml";

    fn write_topo(dir: &Path, yaml: &str) -> PathBuf {
        let path = dir.join(TOPO_FILE);
        fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn parse_full_topology() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("r1.lic"), "license").unwrap();
        let yaml = r#"
name: lab1
mgmt:
  network: clab
  ipv4_subnet: 172.20.20.0/24
  ipv6_subnet: 2001:172:20:20::/64
topology:
  kinds:
    crpd:
      image: crpd:20.2R1.10
  nodes:
    r1:
      kind: crpd
      license: r1.lic
      group: edge
      publish:
        - tcp/22
    r2:
      kind: vr-sros
      image: vrnetlab/vr-sros:20.10.R1
      env:
        CONNECTION_MODE: macvtap
"#;
        let topo = load(&write_topo(dir.path(), yaml)).unwrap();
        assert_eq!(topo.name(), "lab1");
        assert_eq!(topo.lab_root(), dir.path().join("clab-lab1"));

        let nodes = topo.declarations();
        assert_eq!(nodes.len(), 2);
        let r1 = &nodes[0];
        assert_eq!(r1.kind, "crpd");
        assert_eq!(r1.long_name, "clab-lab1-r1");
        assert_eq!(r1.lab_dir, dir.path().join("clab-lab1").join("r1"));
        assert_eq!(r1.image, "crpd:20.2R1.10");
        assert_eq!(r1.license, "r1.lic");
        assert_eq!(r1.group, "edge");
        assert_eq!(r1.publish, vec!["tcp/22"]);
        assert_eq!(r1.mgmt.ipv4_subnet, "172.20.20.0/24");

        let r2 = &nodes[1];
        assert_eq!(r2.env["CONNECTION_MODE"], "macvtap");
        assert!(r2.license.is_empty());
    }

    #[test]
    fn lookup_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("r1.lic"), "license").unwrap();
        let yaml = "name: lab1\ntopology:\n  nodes:\n    r1:\n      kind: crpd\n      license: r1.lic\n";
        let topo = load(&write_topo(dir.path(), yaml)).unwrap();

        let license = topo.node_license("r1").unwrap();
        assert_eq!(PathBuf::from(license), dir.path().join("r1.lic"));
        assert_eq!(topo.node_config("r1").unwrap(), "");
        assert_eq!(topo.node_config("unknown").unwrap(), "");
    }

    #[test]
    fn lookup_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: lab1\ntopology:\n  nodes:\n    r1:\n      kind: crpd\n      config: missing.conf\n";
        let topo = load(&write_topo(dir.path(), yaml)).unwrap();
        assert!(matches!(
            topo.node_config("r1"),
            Err(ClabError::InvalidTopology(_))
        ));
    }

    #[test]
    fn missing_topology_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join(TOPO_FILE)),
            Err(ClabError::TopologyNotFound(_))
        ));
    }

    #[test]
    fn rejects_unsafe_node_names_and_missing_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: lab1\ntopology:\n  nodes:\n    ../etc:\n      kind: crpd\n";
        assert!(matches!(
            load(&write_topo(dir.path(), yaml)),
            Err(ClabError::InvalidTopology(_))
        ));

        let yaml = "name: lab1\ntopology:\n  nodes:\n    r1:\n      image: crpd\n";
        let err = load(&write_topo(dir.path(), yaml)).unwrap_err();
        assert!(err.to_string().contains("has no kind"));
    }
}
