//! The provider registry is an index of provider descriptors keyed by their `type`.
//!
//! It can be seeded with the built-in default for every [`ProviderKind`] and layered
//! with file-defined providers read from `<config_dir>/providers/`. Registration
//! overwrites: a later descriptor for the same kind fully replaces the earlier one, so a
//! provider file always wins over the built-in default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use strum::IntoEnumIterator;
use tracing::debug;

use super::{Provider, ProviderDescriptor, ProviderKind};
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::loader;

/// Sub-directory of the configuration directory holding provider files.
pub const PROVIDERS_DIR: &str = "providers";

#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderKind, ProviderDescriptor>,
    config_dir: Option<PathBuf>,
}

impl ProviderRegistry {
    /// An empty registry with no backing directory.
    pub fn new() -> ProviderRegistry {
        ProviderRegistry::default()
    }

    /// A registry holding the default descriptor of every kind.
    pub fn with_defaults() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();

        for kind in ProviderKind::iter() {
            registry.register_provider(ProviderDescriptor::new(kind));
        }

        registry
    }

    /// A registry holding only the providers defined under `config_dir`.
    ///
    /// Never fails: unreadable or malformed files are logged and skipped.
    pub fn from_dir(config_dir: impl Into<PathBuf>) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.config_dir = Some(config_dir.into());
        registry.load_configurations();
        registry
    }

    /// The defaults, overridden by the providers defined under `config_dir`.
    pub fn with_defaults_and_dir(config_dir: impl Into<PathBuf>) -> ProviderRegistry {
        let mut registry = ProviderRegistry::with_defaults();
        registry.config_dir = Some(config_dir.into());
        registry.load_configurations();
        registry
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    fn load_configurations(&mut self) {
        let dir = match &self.config_dir {
            Some(dir) => dir.join(PROVIDERS_DIR),
            None => return,
        };

        for (stem, provider) in loader::load_dir::<ProviderDescriptor>(&dir) {
            if stem != provider.kind().to_string() {
                debug!(
                    "provider file \"{}\" defines provider \"{}\"",
                    stem,
                    provider.kind()
                );
            }

            self.register_provider(provider);
        }
    }

    /// Inserts `provider`, replacing any provider of the same kind.
    pub fn register_provider(&mut self, provider: ProviderDescriptor) {
        debug!("registering provider \"{}\"", provider.kind());

        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<&ProviderDescriptor> {
        self.providers.get(&kind)
    }

    /// Looks up a provider by its `type` string.
    pub fn get_provider(&self, id: &str) -> Result<&ProviderDescriptor> {
        ProviderKind::from_str(id)
            .ok()
            .and_then(|kind| self.providers.get(&kind))
            .ok_or_else(|| Error::ProviderNotFound(id.to_string()))
    }

    pub fn remove_provider(&mut self, id: &str) -> Result<ProviderDescriptor> {
        ProviderKind::from_str(id)
            .ok()
            .and_then(|kind| self.providers.remove(&kind))
            .ok_or_else(|| Error::ProviderNotFound(id.to_string()))
    }

    /// Every registered provider in kind order. With `only_valid`, providers whose
    /// environment is unusable right now are left out.
    pub fn list_providers(&self, env: &dyn Environment, only_valid: bool) -> Vec<&ProviderDescriptor> {
        self.providers
            .values()
            .filter(|provider| !only_valid || provider.has_valid_env(env))
            .collect()
    }

    /// Every usable provider instance, one per valid provider and location.
    pub fn list_provider_instances(&self, env: &dyn Environment) -> Vec<ProviderDescriptor> {
        self.providers
            .values()
            .flat_map(|provider| provider.iter(env))
            .collect()
    }

    /// Rebuilds the index from the backing directory, dropping everything else.
    /// A registry without a directory is left as is.
    pub fn reload_configurations(&mut self) {
        if self.config_dir.is_none() {
            return;
        }

        self.providers.clear();
        self.load_configurations();
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use super::*;
    use crate::env::EnvVar;
    use crate::providers::Backend;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn config_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let providers = dir.path().join(PROVIDERS_DIR);

        fs::create_dir(&providers).unwrap();

        for (name, contents) in files {
            fs::write(providers.join(name), contents).unwrap();
        }

        dir
    }

    #[test]
    fn bad_file_does_not_abort_loading() {
        let dir = config_dir(&[
            ("anthropic.yml", "type: anthropic\napi_key: $CLAUDE_KEY\n"),
            ("bad.yml", "type: [this is not\n"),
        ]);

        let registry = ProviderRegistry::from_dir(dir.path());
        let env = env(&[]);

        let providers = registry.list_providers(&env, false);
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].kind(), ProviderKind::Anthropic);
    }

    #[test]
    fn unknown_type_is_skipped() {
        let dir = config_dir(&[
            ("pigeon.yml", "type: pigeon\n"),
            ("groq.yaml", "type: groq\n"),
        ]);

        let registry = ProviderRegistry::from_dir(dir.path());

        assert_eq!(registry.len(), 1);
        assert!(registry.get(ProviderKind::Groq).is_some());
    }

    #[test]
    fn file_overrides_default() {
        let dir = config_dir(&[(
            "anthropic.yml",
            "type: anthropic\nname: Claude\napi_key: $CLAUDE_KEY\n",
        )]);

        let registry = ProviderRegistry::with_defaults_and_dir(dir.path());

        assert_eq!(registry.len(), ProviderKind::iter().count());

        let anthropic = registry.get_provider("anthropic").unwrap();
        assert_eq!(anthropic.name(), "Claude");
        assert_eq!(
            anthropic.backend,
            Backend::Anthropic(crate::providers::ApiKeyBackend {
                api_key: Some(EnvVar::named("CLAUDE_KEY")),
                base_url: None,
            })
        );
    }

    #[test]
    fn register_overwrites() {
        let mut registry = ProviderRegistry::new();

        registry.register_provider(ProviderDescriptor::new(ProviderKind::OpenAI));
        registry.register_provider(ProviderDescriptor::new(ProviderKind::OpenAI).with_name("Proxy"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_provider("openai").unwrap().name(), "Proxy");
    }

    #[test]
    fn lookups_report_the_missing_id() {
        let mut registry = ProviderRegistry::new();

        let err = registry.get_provider("anthropic").unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound(ref id) if id == "anthropic"));

        let err = registry.get_provider("nonexistent").unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound(ref id) if id == "nonexistent"));

        assert!(registry.remove_provider("anthropic").is_err());

        registry.register_provider(ProviderDescriptor::new(ProviderKind::Anthropic));
        assert!(registry.remove_provider("anthropic").is_ok());
        assert!(registry.is_empty());
    }

    #[test]
    fn listing_rechecks_environment() {
        let registry = ProviderRegistry::with_defaults();
        let mut env = env(&[]);

        assert!(registry.list_providers(&env, true).is_empty());

        env.insert("ANTHROPIC_API_KEY".to_string(), "key".to_string());

        let valid = registry.list_providers(&env, true);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].kind(), ProviderKind::Anthropic);
    }

    #[test]
    fn instances_expand_locations() {
        let registry = ProviderRegistry::with_defaults();
        let env = env(&[
            ("ANTHROPIC_API_KEY", "key"),
            ("AWS_ACCESS_KEY_ID", "id"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]);

        let instances: Vec<(ProviderKind, Option<String>)> = registry
            .list_provider_instances(&env)
            .iter()
            .map(|p| (p.kind(), p.current().map(|s| s.to_string())))
            .collect();

        assert_eq!(
            instances,
            [
                (ProviderKind::Anthropic, None),
                (ProviderKind::Bedrock, Some("us-east-1".to_string())),
                (ProviderKind::Bedrock, Some("us-west-2".to_string())),
            ]
        );
    }

    #[test]
    fn reload_drops_memory_only_providers() {
        let dir = config_dir(&[("deepseek.yml", "type: deepseek\n")]);

        let mut registry = ProviderRegistry::from_dir(dir.path());
        registry.register_provider(ProviderDescriptor::new(ProviderKind::Mistral));
        assert_eq!(registry.len(), 2);

        fs::write(
            dir.path().join(PROVIDERS_DIR).join("groq.yml"),
            "type: groq\n",
        )
        .unwrap();

        registry.reload_configurations();

        assert_eq!(registry.len(), 2);
        assert!(registry.get(ProviderKind::Mistral).is_none());
        assert!(registry.get(ProviderKind::Groq).is_some());
    }

    #[test]
    fn reload_without_directory_is_a_no_op() {
        let mut registry = ProviderRegistry::with_defaults();

        registry.reload_configurations();

        assert_eq!(registry.len(), ProviderKind::iter().count());
    }
}
