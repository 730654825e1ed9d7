// Each test binary compiles this module independently and uses a different
// subset of helpers, so unused-function warnings are expected.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use clab_core::models::{ContainerSummary, ExecOutput, LabelFilter, Settings};
use clab_core::services::kinds::builtin_profiles;
use clab_core::services::provisioner::NodeLookup;
use clab_core::services::registry::KindRegistry;
use clab_core::services::runtime::ContainerRuntime;
use clab_core::services::templates::TemplateCatalog;
use clab_core::{ClabError, Result};

pub const JUNIPER_TEMPLATE: &str = "system {\n    host-name {{ short_name }};\n}\n";
pub const SSHD_CONFIG: &str = "Port 22\nPermitRootLogin yes\n";
pub const SROS_TEMPLATE: &str = "/configure system name \"{{ short_name }}\"\n";

/// Populate a templates directory the way the packaged one is laid out.
pub fn write_templates(root: &Path) {
    fs::create_dir_all(root.join("crpd")).unwrap();
    fs::create_dir_all(root.join("vr-sros")).unwrap();
    fs::write(root.join("crpd/juniper.conf"), JUNIPER_TEMPLATE).unwrap();
    fs::write(root.join("crpd/sshd_config"), SSHD_CONFIG).unwrap();
    fs::write(root.join("vr-sros/config.txt"), SROS_TEMPLATE).unwrap();
}

pub fn catalog(templates: &Path) -> Arc<TemplateCatalog> {
    Arc::new(TemplateCatalog::from_profiles(
        &Settings::new(templates),
        builtin_profiles(),
    ))
}

pub fn registry(templates: &Path) -> KindRegistry {
    KindRegistry::builtin(catalog(templates))
}

/// Lookup answering from fixed per-node values; unknown nodes resolve empty.
#[derive(Default)]
pub struct StaticLookup {
    pub configs: HashMap<String, String>,
    pub licenses: HashMap<String, String>,
    pub failing: Vec<String>,
}

impl StaticLookup {
    pub fn with_license(mut self, node: &str, path: &Path) -> Self {
        self.licenses
            .insert(node.to_string(), path.to_string_lossy().into_owned());
        self
    }

    pub fn with_config(mut self, node: &str, path: &Path) -> Self {
        self.configs
            .insert(node.to_string(), path.to_string_lossy().into_owned());
        self
    }

    pub fn failing_for(mut self, node: &str) -> Self {
        self.failing.push(node.to_string());
        self
    }
}

impl NodeLookup for StaticLookup {
    fn node_config(&self, short_name: &str) -> Result<String> {
        if self.failing.iter().any(|n| n == short_name) {
            return Err(ClabError::InvalidTopology(format!(
                "config for {short_name} does not exist"
            )));
        }
        Ok(self.configs.get(short_name).cloned().unwrap_or_default())
    }

    fn node_license(&self, short_name: &str) -> Result<String> {
        Ok(self.licenses.get(short_name).cloned().unwrap_or_default())
    }
}

/// Every file under `root` with its contents, keyed by relative path.
pub fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                out.insert(path.strip_prefix(root).unwrap().to_path_buf(), Vec::new());
                walk(root, &path, out);
            } else {
                out.insert(
                    path.strip_prefix(root).unwrap().to_path_buf(),
                    fs::read(&path).unwrap(),
                );
            }
        }
    }
    let mut out = BTreeMap::new();
    if root.exists() {
        walk(root, root, &mut out);
    }
    out
}

pub fn container(id: &str, name: &str, state: &str, labels: &[(&str, &str)]) -> ContainerSummary {
    ContainerSummary {
        id: id.to_string(),
        names: vec![name.to_string()],
        state: state.to_string(),
        labels: labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

/// In-memory runtime that records every call.
#[derive(Default)]
pub struct FakeRuntime {
    pub containers: Vec<ContainerSummary>,
    /// Stdout returned for commands whose argv starts with the key words.
    pub responses: Vec<(Vec<String>, ExecOutput)>,
    pub failing_containers: Vec<String>,
    pub execs: Mutex<Vec<(String, Vec<String>)>>,
    pub detached: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeRuntime {
    pub fn respond(mut self, prefix: &[&str], stdout: &str) -> Self {
        self.responses.push((
            prefix.iter().map(|s| s.to_string()).collect(),
            ExecOutput {
                stdout: stdout.to_string(),
                ..ExecOutput::default()
            },
        ));
        self
    }

    pub fn exec_calls(&self) -> Vec<(String, Vec<String>)> {
        self.execs.lock().unwrap().clone()
    }

    pub fn detached_calls(&self) -> Vec<(String, Vec<String>)> {
        self.detached.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_containers(&self, filters: &[LabelFilter]) -> Result<Vec<ContainerSummary>> {
        Ok(self
            .containers
            .iter()
            .filter(|c| filters.iter().all(|f| f.matches(&c.labels)))
            .cloned()
            .collect())
    }

    async fn exec(&self, container: &str, cmd: &[String]) -> Result<ExecOutput> {
        self.execs
            .lock()
            .unwrap()
            .push((container.to_string(), cmd.to_vec()));
        if self.failing_containers.iter().any(|c| c == container) {
            return Err(ClabError::Runtime(format!("container {container} is gone")));
        }
        Ok(self
            .responses
            .iter()
            .find(|(prefix, _)| cmd.starts_with(prefix))
            .map(|(_, out)| out.clone())
            .unwrap_or_default())
    }

    async fn exec_detached(&self, container: &str, cmd: &[String]) -> Result<()> {
        self.detached
            .lock()
            .unwrap()
            .push((container.to_string(), cmd.to_vec()));
        Ok(())
    }
}
