use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{ClabError, Result};
use crate::models::{LaunchSpec, NodeDeclaration};
use crate::services::fs_utils::{self, LAB_DIR_MODE};
use crate::services::provisioner::NodeLookup;
use crate::services::registry::KindRegistry;

/// Result of provisioning a single node.
#[derive(Debug)]
pub struct NodeOutcome {
    pub node: String,
    pub kind: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result: Result<LaunchSpec>,
}

impl NodeOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-node outcomes of one provisioning run, in declaration order.
#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub outcomes: Vec<NodeOutcome>,
}

impl ProvisionReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(NodeOutcome::is_success)
    }

    pub fn launch_specs(&self) -> Vec<LaunchSpec> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().cloned())
            .collect()
    }

    pub fn failures(&self) -> Vec<(&str, &ClabError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.node.as_str(), e)))
            .collect()
    }

    pub fn get(&self, node: &str) -> Option<&NodeOutcome> {
        self.outcomes.iter().find(|o| o.node == node)
    }
}

/// Provisions every node of a lab: one blocking task per node, with a
/// failure in one node never affecting the others.
#[derive(Clone)]
pub struct LabProvisioner {
    registry: Arc<KindRegistry>,
    lookup: Arc<dyn NodeLookup>,
}

impl LabProvisioner {
    pub fn new(registry: Arc<KindRegistry>, lookup: Arc<dyn NodeLookup>) -> Self {
        Self { registry, lookup }
    }

    /// Create the node's lab directory, build its launch spec, then stage files.
    pub fn provision_node(&self, node: &NodeDeclaration) -> Result<LaunchSpec> {
        let provisioner = self.registry.lookup(&node.kind)?;
        fs_utils::create_directory(&node.lab_dir, LAB_DIR_MODE)?;

        let spec = provisioner.init_launch_spec(node, self.lookup.as_ref())?;
        provisioner.stage_files(node, &spec)?;

        tracing::info!("node={}, kind={}, provisioned", node.short_name, node.kind);
        Ok(spec)
    }

    pub async fn provision_all(&self, nodes: Vec<NodeDeclaration>) -> ProvisionReport {
        let handles: Vec<_> = nodes
            .into_iter()
            .map(|node| {
                let this = self.clone();
                let name = node.short_name.clone();
                let kind = node.kind.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    let started_at = Utc::now();
                    let result = this.provision_node(&node);
                    (started_at, Utc::now(), result)
                });
                (name, kind, handle)
            })
            .collect();

        let mut report = ProvisionReport::default();
        for (node, kind, handle) in handles {
            let (started_at, finished_at, result) = match handle.await {
                Ok(done) => done,
                Err(e) => {
                    let now = Utc::now();
                    (now, now, Err(ClabError::Runtime(format!("provisioning task failed: {e}"))))
                }
            };
            if let Err(ref e) = result {
                tracing::error!("node={node}, provisioning failed: {e}");
            }
            report.outcomes.push(NodeOutcome {
                node,
                kind,
                started_at,
                finished_at,
                result,
            });
        }
        report
    }
}
