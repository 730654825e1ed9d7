use std::sync::Arc;

use crate::error::{ClabError, Result};
use crate::models::{LaunchSpec, NodeDeclaration};
use crate::services::kinds::{under_lab, KindProfile};
use crate::services::staging::FileStagingPlan;
use crate::services::templates::{TemplateCatalog, TemplateData};

/// Resolves the user-declared config and license for a node.
/// An empty string means nothing was declared.
pub trait NodeLookup: Send + Sync {
    fn node_config(&self, short_name: &str) -> Result<String>;
    fn node_license(&self, short_name: &str) -> Result<String>;
}

/// Per-kind provisioning: build the launch spec, then stage the lab directory.
///
/// `init_launch_spec` never writes to disk. `stage_files` only writes under
/// the node's lab directory and must be called with the launch spec that
/// `init_launch_spec` returned for the same node.
pub trait Provisioner: Send + Sync {
    fn kind(&self) -> &str;

    fn init_launch_spec(&self, node: &NodeDeclaration, lookup: &dyn NodeLookup)
        -> Result<LaunchSpec>;

    fn stage_files(&self, node: &NodeDeclaration, spec: &LaunchSpec) -> Result<()>;
}

/// Provisioner driven entirely by a [`KindProfile`].
pub struct ProfileProvisioner {
    profile: &'static KindProfile,
    catalog: Arc<TemplateCatalog>,
}

impl ProfileProvisioner {
    pub fn new(profile: &'static KindProfile, catalog: Arc<TemplateCatalog>) -> Self {
        Self { profile, catalog }
    }

    fn staging_plan(&self, node: &NodeDeclaration, spec: &LaunchSpec) -> FileStagingPlan {
        FileStagingPlan::for_node(self.profile, &self.catalog, node, spec)
    }
}

impl Provisioner for ProfileProvisioner {
    fn kind(&self) -> &str {
        self.profile.kind
    }

    fn init_launch_spec(
        &self,
        node: &NodeDeclaration,
        lookup: &dyn NodeLookup,
    ) -> Result<LaunchSpec> {
        debug_assert_eq!(node.kind, self.profile.kind);

        let mut spec = LaunchSpec {
            name: node.long_name.clone(),
            short_name: node.short_name.clone(),
            kind: node.kind.clone(),
            image: node.image.clone(),
            group: node.group.clone(),
            position: node.position.clone(),
            user: node.user.clone(),
            env: node.env.clone(),
            node_type: node.node_type.clone(),
            ..LaunchSpec::default()
        };

        spec.config =
            lookup
                .node_config(&node.short_name)
                .map_err(|e| ClabError::ConfigResolution {
                    node: node.short_name.clone(),
                    reason: e.to_string(),
                })?;
        if spec.config.is_empty() {
            if let Some(template) = self.catalog.default_for(self.profile.kind) {
                spec.config = template.to_string_lossy().into_owned();
            }
        }

        if spec.node_type.is_empty() {
            if let Some(default_type) = self.profile.default_node_type {
                spec.node_type = default_type.to_string();
            }
        }

        spec.license =
            lookup
                .node_license(&node.short_name)
                .map_err(|e| ClabError::LicenseResolution {
                    node: node.short_name.clone(),
                    reason: e.to_string(),
                })?;

        for bind in self.profile.binds {
            spec.add_bind(
                under_lab(&node.lab_dir, bind.lab_suffix),
                bind.container_path,
            );
        }

        spec.merge_env_defaults(
            self.profile
                .env_defaults
                .iter()
                .map(|d| (d.key.to_string(), d.value.resolve(&node.mgmt))),
        );

        if let Some(device) = self.profile.device_bind {
            if spec.env.get(device.env_key).map(String::as_str) == Some(device.trigger) {
                spec.add_bind(device.host_path, device.container_path);
            }
        }

        if let Some(entrypoint) = self.profile.entrypoint {
            spec.entrypoint = entrypoint.to_string();
        }
        spec.cmd = self.profile.cmd.build(&spec);

        Ok(spec)
    }

    fn stage_files(&self, node: &NodeDeclaration, spec: &LaunchSpec) -> Result<()> {
        let plan = self.staging_plan(node, spec);
        tracing::debug!(
            "node={}, staging {} step(s) under {}",
            node.short_name,
            plan.ops().len(),
            plan.lab_dir().display()
        );
        plan.execute(&TemplateData::new(node, spec))
    }
}
