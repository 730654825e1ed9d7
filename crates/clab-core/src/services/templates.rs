use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::{ClabError, Result};
use crate::models::{LaunchSpec, MgmtNet, NodeDeclaration, Settings};
use crate::services::kinds::KindProfile;

/// Immutable kind -> default template table plus the root of kind support files.
/// Built once at startup and shared by every provisioner.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    root: PathBuf,
    defaults: HashMap<String, PathBuf>,
}

impl TemplateCatalog {
    pub fn new<'a, I>(root: impl Into<PathBuf>, defaults: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let root = root.into();
        let defaults = defaults
            .into_iter()
            .map(|(kind, rel)| (kind.to_string(), root.join(rel)))
            .collect();
        Self { root, defaults }
    }

    pub fn from_profiles<'a>(
        settings: &Settings,
        profiles: impl IntoIterator<Item = &'a KindProfile>,
    ) -> Self {
        Self::new(
            settings.templates_dir.clone(),
            profiles
                .into_iter()
                .filter_map(|p| p.default_template.map(|t| (p.kind, t))),
        )
    }

    pub fn default_for(&self, kind: &str) -> Option<&Path> {
        self.defaults.get(kind).map(PathBuf::as_path)
    }

    pub fn support_file(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

/// Values exposed to config templates.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateData<'a> {
    pub short_name: &'a str,
    pub long_name: &'a str,
    pub kind: &'a str,
    pub image: &'a str,
    pub node_type: &'a str,
    pub group: &'a str,
    pub position: &'a str,
    pub license: &'a str,
    pub mgmt: &'a MgmtNet,
    pub env: &'a BTreeMap<String, String>,
}

impl<'a> TemplateData<'a> {
    pub fn new(node: &'a NodeDeclaration, spec: &'a LaunchSpec) -> Self {
        Self {
            short_name: &node.short_name,
            long_name: &node.long_name,
            kind: &node.kind,
            image: &spec.image,
            node_type: &spec.node_type,
            group: &spec.group,
            position: &spec.position,
            license: &spec.license,
            mgmt: &node.mgmt,
            env: &spec.env,
        }
    }
}

/// Render the template at `template` into `dest`, replacing any previous file.
pub fn render_config(dest: &Path, template: &Path, data: &TemplateData<'_>) -> Result<()> {
    let render_err = |reason: String| ClabError::ConfigRender {
        path: dest.to_path_buf(),
        reason,
    };

    let source = std::fs::read_to_string(template)
        .map_err(|e| render_err(format!("reading template {}: {e}", template.display())))?;
    let context = Context::from_serialize(data).map_err(|e| render_err(e.to_string()))?;
    let rendered = Tera::one_off(&source, &context, false)
        .map_err(|e| render_err(format!("template {}: {e}", template.display())))?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| render_err(e.to_string()))?;
    }
    std::fs::write(dest, rendered.as_bytes()).map_err(|e| render_err(e.to_string()))?;

    tracing::debug!(
        "generated config {} from {} ({} bytes)",
        dest.display(),
        template.display(),
        rendered.len()
    );
    Ok(())
}
