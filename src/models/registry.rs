use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ModelCapability, ModelConfiguration};
use crate::error::{Error, Result};
use crate::loader;
use crate::parameters::ValidationMode;
use crate::providers::{ProviderDescriptor, ProviderRegistry};

/// Sub-directory of the configuration directory holding model files.
pub const MODELS_DIR: &str = "models";

/// A provider reference inside a model definition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ProviderEntry {
    /// A provider type, looked up in the provider registry
    Registered(String),
    /// A complete descriptor used as written
    Inline(ProviderDescriptor),
}

impl ProviderEntry {
    pub fn resolve(&self, providers: &ProviderRegistry) -> Result<ProviderDescriptor> {
        match self {
            ProviderEntry::Registered(id) => providers.get_provider(id).cloned(),
            ProviderEntry::Inline(descriptor) => Ok(descriptor.clone()),
        }
    }
}

/// A model as written in a model file.
///
/// Identical to [`ModelConfiguration`] except that `providers` may name registered
/// providers by type:
///
/// ```yaml
/// identity: { id: claude-4-sonnet, name: Claude 4 Sonnet }
/// constraints: { max_input_tokens: 200000, max_output_tokens: 64000 }
/// providers:
///   - type: vertex
///     model_family: claude
///   - anthropic
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct ModelDefinition {
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
    #[serde(flatten)]
    pub model: ModelConfiguration,
}

impl ModelDefinition {
    pub fn into_configuration(self, providers: &ProviderRegistry) -> Result<ModelConfiguration> {
        let mut model = self.model;

        model.providers = self
            .providers
            .iter()
            .map(|entry| entry.resolve(providers))
            .collect::<Result<_>>()?;

        Ok(model)
    }
}

/// Every known model, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelConfiguration>,
    validation_mode: ValidationMode,
}

impl ModelRegistry {
    pub fn new() -> ModelRegistry {
        ModelRegistry::default()
    }

    /// How parameter overrides applied through this registry (by presets) treat
    /// rule violations.
    pub fn validation_mode(&self) -> ValidationMode {
        self.validation_mode
    }

    pub fn set_validation_mode(&mut self, mode: ValidationMode) {
        self.validation_mode = mode;
    }

    /// Inserts `model`, replacing any model with the same id.
    pub fn register_model(&mut self, model: ModelConfiguration) {
        debug!("registering model \"{}\"", model.id());

        self.models.insert(model.id().to_string(), model);
    }

    pub fn register_definition(
        &mut self,
        definition: ModelDefinition,
        providers: &ProviderRegistry,
    ) -> Result<()> {
        let model = definition.into_configuration(providers)?;
        self.register_model(model);
        Ok(())
    }

    pub fn get_model(&self, id: &str) -> Result<&ModelConfiguration> {
        self.models
            .get(id)
            .ok_or_else(|| Error::ModelNotFound(id.to_string()))
    }

    pub fn remove_model(&mut self, id: &str) -> Result<ModelConfiguration> {
        self.models
            .remove(id)
            .ok_or_else(|| Error::ModelNotFound(id.to_string()))
    }

    /// Every model, sorted by id.
    pub fn list_models(&self) -> Vec<&ModelConfiguration> {
        self.models.values().collect()
    }

    pub fn models_with_capabilities(
        &self,
        required: &BTreeSet<ModelCapability>,
    ) -> Vec<&ModelConfiguration> {
        self.models
            .values()
            .filter(|model| model.check_capabilities(required))
            .collect()
    }

    /// Registers the embedded catalogue. A model whose providers are not all
    /// registered is logged and skipped.
    pub fn load_builtin(&mut self, providers: &ProviderRegistry) {
        for (name, definition) in super::builtin_definitions() {
            if let Err(err) = self.register_definition(definition, providers) {
                warn!("skipping built-in model \"{}\": {}", name, err);
            }
        }
    }

    /// Registers the models defined under `<config_dir>/models/`. Files that fail to
    /// parse or reference an unknown provider are logged and skipped.
    pub fn load_dir(&mut self, config_dir: &Path, providers: &ProviderRegistry) {
        let dir = config_dir.join(MODELS_DIR);

        for (stem, definition) in loader::load_dir::<ModelDefinition>(&dir) {
            if let Err(err) = self.register_definition(definition, providers) {
                warn!("skipping model file \"{}\": {}", stem, err);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tracing_test::traced_test;

    use super::*;
    use crate::parameters::ParameterVariant;
    use crate::providers::{Provider, ProviderKind};

    const DEFINITION: &str = "\
identity:
  id: tiny-model
  name: Tiny
constraints:
  max_input_tokens: 4096
  max_output_tokens: 512
capabilities: [streaming, vision]
metadata:
  release_date: '2024-05-13'
integration_aliases:
  litellm: vendor/tiny
providers:
  - anthropic
  - type: azure
    locations: [westeurope]
parameters:
  temperature:
    variant: variable
    value: 0.2
    validation_rule: { type: range, min_value: 0, max_value: 1 }
  seed:
    variant: unsupported
";

    #[test]
    fn definition_resolves_registered_and_inline_providers() {
        let definition: ModelDefinition = serde_yml::from_str(DEFINITION).unwrap();
        let providers = ProviderRegistry::with_defaults();

        let model = definition.into_configuration(&providers).unwrap();

        assert_eq!(model.id(), "tiny-model");
        assert_eq!(model.providers.len(), 2);
        assert_eq!(model.providers[0], ProviderDescriptor::new(ProviderKind::Anthropic));
        assert_eq!(model.providers[1].kind(), ProviderKind::Azure);
        assert_eq!(model.providers[1].locations(), ["westeurope"]);
        assert_eq!(model.parameters.temperature.value, Some(0.2));
        assert_eq!(model.parameters.seed.variant, ParameterVariant::Unsupported);
        assert_eq!(model.parameters.top_p.variant, ParameterVariant::Variable);
        assert_eq!(
            model.metadata.release_date,
            chrono::NaiveDate::from_ymd_opt(2024, 5, 13)
        );
        assert_eq!(model.alias_for("litellm"), "vendor/tiny");
    }

    #[test]
    fn unregistered_provider_fails_definition() {
        let definition: ModelDefinition = serde_yml::from_str(DEFINITION).unwrap();
        let providers = ProviderRegistry::new();

        let err = definition.into_configuration(&providers).unwrap_err();

        assert!(matches!(err, Error::ProviderNotFound(ref id) if id == "anthropic"));
    }

    #[test]
    fn register_get_remove() {
        let mut registry = ModelRegistry::new();
        let providers = ProviderRegistry::with_defaults();
        let definition: ModelDefinition = serde_yml::from_str(DEFINITION).unwrap();

        registry.register_definition(definition, &providers).unwrap();

        assert!(registry.get_model("tiny-model").is_ok());
        assert!(matches!(
            registry.get_model("huge-model").unwrap_err(),
            Error::ModelNotFound(ref id) if id == "huge-model"
        ));

        registry.remove_model("tiny-model").unwrap();
        assert!(registry.is_empty());
        assert!(registry.remove_model("tiny-model").is_err());
    }

    #[test]
    fn capability_query() {
        let mut registry = ModelRegistry::new();
        registry.load_builtin(&ProviderRegistry::with_defaults());

        let search: BTreeSet<ModelCapability> = [ModelCapability::WebSearch].into_iter().collect();
        let ids: Vec<&str> = registry
            .models_with_capabilities(&search)
            .iter()
            .map(|m| m.id())
            .collect();

        assert_eq!(ids, ["perplexity-sonar-large"]);
    }

    #[test]
    #[traced_test]
    fn load_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join(MODELS_DIR);
        fs::create_dir(&models).unwrap();

        fs::write(models.join("tiny.yml"), DEFINITION).unwrap();
        fs::write(models.join("broken.yml"), "identity: [\n").unwrap();
        fs::write(
            models.join("orphan.yaml"),
            DEFINITION
                .replace("tiny-model", "orphan-model")
                .replace("  - anthropic\n", "  - nonexistent\n"),
        )
        .unwrap();
        fs::write(
            models.join("inverted.yml"),
            DEFINITION
                .replace("tiny-model", "inverted-model")
                .replace("min_value: 0, max_value: 1", "min_value: 1.0, max_value: 0.0"),
        )
        .unwrap();

        let mut registry = ModelRegistry::new();
        registry.load_dir(dir.path(), &ProviderRegistry::with_defaults());

        let ids: Vec<&str> = registry.list_models().iter().map(|m| m.id()).collect();
        assert_eq!(ids, ["tiny-model"]);

        assert!(logs_contain("broken.yml"));
        assert!(logs_contain("invalid range"));
        assert!(logs_contain("skipping model file \"orphan\""));
    }

    #[test]
    #[traced_test]
    fn clamping_a_model_parameter_stays_in_range() {
        let definition: ModelDefinition = serde_yml::from_str(DEFINITION).unwrap();
        let mut model = definition
            .into_configuration(&ProviderRegistry::with_defaults())
            .unwrap();

        let overrides = crate::parameters::ModelParameters {
            temperature: crate::parameters::Setting::Explicit(4.0),
            ..Default::default()
        };
        model
            .set_parameters_with(&overrides, ValidationMode::Clamp)
            .unwrap();

        assert_eq!(model.parameters.temperature.value, Some(1.0));
        assert!(logs_contain("clamping parameter"));
    }
}
