//! Model configurations.
//!
//! A [`ModelConfiguration`] describes one model: who made it, what it can do, what it
//! costs, which providers serve it (in fallback order) and which generation parameters
//! it accepts. Enumerating a configuration expands its provider list into the ordered
//! chain of concrete (provider, location) candidates.

mod builtin;
pub(crate) mod registry;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::parameters::{ConfigurableParameters, ModelParameters, ParameterMap, ValidationMode};
use crate::providers::{Provider, ProviderDescriptor};

pub use builtin::builtin_definitions;
pub use registry::{ModelDefinition, ModelRegistry, ProviderEntry};

#[derive(
    Serialize,
    Deserialize,
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelMode {
    #[default]
    Chat,
    Completion,
    Embedding,
}

/// Feature flags a model may support. Presets filter on these.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelCapability {
    Streaming,
    FunctionCalling,
    ParallelFunctionCalling,
    Tools,
    JsonMode,
    SystemPrompt,
    Vision,
    Reasoning,
    WebSearch,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelIdentity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub creator: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,
    pub max_input_tokens: u64,
    pub max_output_tokens: u64,
}

/// An advisory score with a human readable label.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Rating {
    pub score: f64,
    pub label: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Rating>,
}

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrivacyLevel {
    Basic,
    Hipaa,
    Gdpr,
    Fedramp,
    Soc2,
}

/// Prices in USD per thousand tokens.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelPricing {
    pub input_price_per_1k: f64,
    pub output_price_per_1k: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelMetadata {
    #[serde(default)]
    pub privacy_level: Vec<PrivacyLevel>,
    #[serde(default)]
    pub pricing: ModelPricing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_cutoff_date: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelConfiguration {
    pub identity: ModelIdentity,
    #[serde(default)]
    pub mode: ModelMode,
    #[serde(default)]
    pub capabilities: BTreeSet<ModelCapability>,
    pub constraints: ModelConstraints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ModelProperties>,
    #[serde(default)]
    pub metadata: ModelMetadata,
    /// Model id override per downstream consumer (`litellm`, `openrouter`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub integration_aliases: BTreeMap<String, String>,
    /// Providers in fallback order, most preferred first
    #[serde(default)]
    pub providers: Vec<ProviderDescriptor>,
    #[serde(default)]
    pub parameters: ConfigurableParameters,
}

impl ModelConfiguration {
    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// The full fallback chain: every usable instance of the first provider, in
    /// location order, then the second provider, and so on.
    pub fn iter<'a>(
        &'a self,
        env: &'a dyn Environment,
    ) -> impl Iterator<Item = ProviderDescriptor> + 'a {
        self.providers.iter().flat_map(move |provider| provider.iter(env))
    }

    /// One candidate per usable provider, pinned to its current location.
    pub fn iter_default_regions<'a>(
        &'a self,
        env: &'a dyn Environment,
    ) -> impl Iterator<Item = ProviderDescriptor> + 'a {
        self.providers
            .iter()
            .filter(move |provider| provider.has_valid_env(env))
            .map(|provider| match provider.current() {
                Some(location) => provider.at_location(location),
                None => provider.clone(),
            })
    }

    /// True if the model supports every capability in `required`.
    pub fn check_capabilities(&self, required: &BTreeSet<ModelCapability>) -> bool {
        required.is_subset(&self.capabilities)
    }

    /// Applies caller overrides, rejecting any rule violation.
    pub fn set_parameters(&mut self, overrides: &ModelParameters) -> Result<()> {
        self.set_parameters_with(overrides, ValidationMode::Error)
    }

    pub fn set_parameters_with(
        &mut self,
        overrides: &ModelParameters,
        mode: ValidationMode,
    ) -> Result<()> {
        self.parameters.set_parameters(overrides, mode)
    }

    /// The resolved parameters as `provider` expects to receive them.
    pub fn provider_parameters(&self, provider: &ProviderDescriptor) -> ParameterMap {
        provider.map_parameters(&self.parameters.resolved())
    }

    /// The id a downstream consumer knows this model by.
    pub fn alias_for(&self, consumer: &str) -> &str {
        self.integration_aliases
            .get(consumer)
            .map(String::as_str)
            .unwrap_or(self.id())
    }

    /// A copy of this configuration served by `provider` alone.
    pub fn with_provider(&self, provider: ProviderDescriptor) -> ModelConfiguration {
        let mut copy = self.clone();
        copy.providers = vec![provider];
        copy
    }

    pub fn ensure_chat(&self) -> Result<()> {
        match self.mode {
            ModelMode::Chat => Ok(()),
            mode => Err(Error::UnsupportedMode {
                model: self.identity.id.clone(),
                mode: mode.to_string(),
            }),
        }
    }
}
