use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ClabError, Result};
use crate::services::kinds::builtin_profiles;
use crate::services::provisioner::{ProfileProvisioner, Provisioner};
use crate::services::templates::TemplateCatalog;

/// Maps a kind identifier to the provisioner that handles it.
#[derive(Default, Clone)]
pub struct KindRegistry {
    provisioners: HashMap<String, Arc<dyn Provisioner>>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in kind.
    pub fn builtin(catalog: Arc<TemplateCatalog>) -> Self {
        let mut registry = Self::new();
        for profile in builtin_profiles() {
            registry.register(Arc::new(ProfileProvisioner::new(profile, catalog.clone())));
        }
        registry
    }

    /// Add a provisioner under its own kind, returning the one it replaced.
    pub fn register(&mut self, provisioner: Arc<dyn Provisioner>) -> Option<Arc<dyn Provisioner>> {
        self.provisioners
            .insert(provisioner.kind().to_string(), provisioner)
    }

    pub fn lookup(&self, kind: &str) -> Result<Arc<dyn Provisioner>> {
        self.provisioners
            .get(kind)
            .cloned()
            .ok_or_else(|| ClabError::UnsupportedKind(kind.to_string()))
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.provisioners.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LaunchSpec, NodeDeclaration, Settings};
    use crate::services::provisioner::NodeLookup;

    fn registry() -> KindRegistry {
        let catalog = TemplateCatalog::from_profiles(&Settings::default(), builtin_profiles());
        KindRegistry::builtin(Arc::new(catalog))
    }

    #[test]
    fn builtin_kinds_are_registered() {
        assert_eq!(registry().kinds(), vec!["crpd", "sonic", "vr-sros"]);
        assert_eq!(registry().lookup("vr-sros").unwrap().kind(), "vr-sros");
    }

    #[test]
    fn unknown_kind_is_unsupported() {
        let err = registry().lookup("srl").err().unwrap();
        assert!(matches!(err, ClabError::UnsupportedKind(ref k) if k == "srl"));
    }

    struct Linux;

    impl Provisioner for Linux {
        fn kind(&self) -> &str {
            "linux"
        }
        fn init_launch_spec(&self, node: &NodeDeclaration, _: &dyn NodeLookup) -> Result<LaunchSpec> {
            Ok(LaunchSpec {
                short_name: node.short_name.clone(),
                ..LaunchSpec::default()
            })
        }
        fn stage_files(&self, _: &NodeDeclaration, _: &LaunchSpec) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn new_kinds_can_be_registered() {
        let mut registry = registry();
        assert!(registry.register(Arc::new(Linux)).is_none());
        assert_eq!(registry.lookup("linux").unwrap().kind(), "linux");
        assert_eq!(registry.lookup("crpd").unwrap().kind(), "crpd");
    }
}
