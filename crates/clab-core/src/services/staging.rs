use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{LaunchSpec, NodeDeclaration};
use crate::services::fs_utils::{self, LAB_DIR_MODE};
use crate::services::kinds::{under_lab, KindProfile, RenderGate};
use crate::services::templates::{self, TemplateCatalog, TemplateData};

/// One step of staging a node's lab directory. Targets are fixed suffixes
/// from the kind profile, joined onto the node's lab directory at execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingOp {
    CreateDirectory { target: &'static str },
    RenderConfig { template: PathBuf, target: &'static str },
    CopySupportFile { source: PathBuf, target: &'static str },
    CopyLicense { source: PathBuf, target: &'static str },
}

#[derive(Debug, Clone)]
pub struct FileStagingPlan {
    lab_dir: PathBuf,
    ops: Vec<StagingOp>,
}

impl FileStagingPlan {
    pub fn for_node(
        profile: &KindProfile,
        catalog: &TemplateCatalog,
        node: &NodeDeclaration,
        spec: &LaunchSpec,
    ) -> Self {
        let mut ops: Vec<StagingOp> = profile
            .directories
            .iter()
            .map(|&target| StagingOp::CreateDirectory { target })
            .collect();

        if let Some(config) = profile.config_target {
            let gated_out = config.gate == RenderGate::RequiresLicense && spec.license.is_empty();
            if gated_out {
                tracing::debug!("node={}, no license, skipping config generation", node.short_name);
            } else if spec.config.is_empty() {
                tracing::debug!("node={}, no config template, skipping generation", node.short_name);
            } else {
                ops.push(StagingOp::RenderConfig {
                    template: PathBuf::from(&spec.config),
                    target: config.lab_suffix,
                });
            }
        }

        ops.extend(profile.support_files.iter().map(|f| StagingOp::CopySupportFile {
            source: catalog.support_file(f.template),
            target: f.lab_suffix,
        }));

        if let Some(target) = profile.license_target {
            if !spec.license.is_empty() {
                ops.push(StagingOp::CopyLicense {
                    source: PathBuf::from(&spec.license),
                    target,
                });
            }
        }

        Self {
            lab_dir: node.lab_dir.clone(),
            ops,
        }
    }

    pub fn lab_dir(&self) -> &Path {
        &self.lab_dir
    }

    pub fn ops(&self) -> &[StagingOp] {
        &self.ops
    }

    /// Run every step in order. Config rendering is best effort; directory
    /// and file copy failures stop staging.
    pub fn execute(&self, data: &TemplateData<'_>) -> Result<()> {
        for op in &self.ops {
            match op {
                StagingOp::CreateDirectory { target } => {
                    fs_utils::create_directory(&under_lab(&self.lab_dir, *target), LAB_DIR_MODE)?;
                }
                StagingOp::RenderConfig { template, target } => {
                    let dest = under_lab(&self.lab_dir, *target);
                    if let Err(e) = templates::render_config(&dest, template, data) {
                        tracing::error!("node={}, failed to generate config: {e}", data.short_name);
                    }
                }
                StagingOp::CopySupportFile { source, target }
                | StagingOp::CopyLicense { source, target } => {
                    fs_utils::copy_file(source, &under_lab(&self.lab_dir, *target))?;
                }
            }
        }
        Ok(())
    }
}
