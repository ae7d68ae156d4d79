//! Provider descriptors and their regional enumeration.
//!
//! A provider is a backend that can serve a model (OpenAI, Anthropic, Vertex, ...). Each
//! one is described by a [`ProviderDescriptor`], a tagged value selected by its `type`
//! discriminator ([`ProviderKind`]). The operations every descriptor supports are
//! gathered in the [`Provider`] trait:
//!
//! - Environment check: a provider whose credentials are missing is unusable and is
//!   filtered out at the source, never reported as an error.
//! - Regional enumeration: a provider with several locations is a family of
//!   interchangeable deployments. [`Provider::iter`] yields one instance per location in
//!   declared order, the first location being the default.
//! - Parameter mapping: a provider may rename or drop standard parameters before they
//!   are sent.
//!
//! Enumeration never mutates the descriptor it starts from. Every instance it yields is
//! a new value pinned to one location, so concurrent enumerations cannot observe each
//! other.

mod descriptor;
pub(crate) mod registry;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::env::{EnvVar, Environment};
use crate::parameters::ParameterMap;

pub use descriptor::{
    ApiKeyBackend, AzureBackend, Backend, BedrockBackend, ProviderDescriptor, VertexBackend,
};
pub use registry::ProviderRegistry;

/// The `type` discriminator of a provider.
///
/// The `to_string` and `FromStr` forms are used as registry keys and in provider files,
/// and should remain stable.
#[derive(
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Azure,
    Anthropic,
    Vertex,
    Bedrock,
    OpenRouter,
    DeepSeek,
    Perplexity,
    Together,
    Fireworks,
    Grok,
    Groq,
    Mistral,
}

impl ProviderKind {
    /// Display name used when a descriptor does not set one.
    pub fn default_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::Azure => "Azure",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Vertex => "Vertex AI",
            ProviderKind::Bedrock => "AWS Bedrock",
            ProviderKind::OpenRouter => "OpenRouter",
            ProviderKind::DeepSeek => "DeepSeek",
            ProviderKind::Perplexity => "Perplexity AI",
            ProviderKind::Together => "TogetherAI",
            ProviderKind::Fireworks => "Fireworks AI",
            ProviderKind::Grok => "Grok",
            ProviderKind::Groq => "Groq",
            ProviderKind::Mistral => "Mistral AI",
        }
    }

    /// Environment variable holding the API key, for key-authenticated providers.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            ProviderKind::Azure => Some("AZURE_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::OpenRouter => Some("OPENROUTER_API_KEY"),
            ProviderKind::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ProviderKind::Perplexity => Some("PERPLEXITY_API_KEY"),
            ProviderKind::Together => Some("TOGETHER_API_KEY"),
            ProviderKind::Fireworks => Some("FIREWORKS_API_KEY"),
            ProviderKind::Grok => Some("XAI_API_KEY"),
            ProviderKind::Groq => Some("GROQ_API_KEY"),
            ProviderKind::Mistral => Some("MISTRAL_API_KEY"),
            ProviderKind::Vertex | ProviderKind::Bedrock => None,
        }
    }

    /// Endpoint used when a descriptor does not set one.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAI => Some("https://api.openai.com/v1/"),
            ProviderKind::OpenRouter => Some("https://openrouter.ai/api/v1"),
            ProviderKind::DeepSeek => Some("https://api.deepseek.com"),
            ProviderKind::Perplexity => Some("https://api.perplexity.ai/"),
            ProviderKind::Together => Some("https://api.together.xyz/v1"),
            ProviderKind::Fireworks => Some("https://api.fireworks.ai/inference/v1"),
            ProviderKind::Grok => Some("https://api.x.ai/v1"),
            _ => None,
        }
    }
}

/// How a provider receives one standard parameter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ParameterMapping {
    /// Provider-specific field name. The standard name is kept when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the provider accepts the parameter at all.
    #[serde(default = "default_supported")]
    pub supported: bool,
}

fn default_supported() -> bool {
    true
}

impl ParameterMapping {
    pub fn rename(name: &str) -> ParameterMapping {
        ParameterMapping {
            name: Some(name.to_string()),
            supported: true,
        }
    }

    pub fn unsupported() -> ParameterMapping {
        ParameterMapping {
            name: None,
            supported: false,
        }
    }
}

/// Operations shared by every provider descriptor.
pub trait Provider: Clone {
    fn kind(&self) -> ProviderKind;

    fn name(&self) -> &str;

    /// Every environment reference the provider declares, labelled by field.
    fn env_refs(&self) -> Vec<(&'static str, EnvVar)>;

    /// Declared locations in preference order. Empty for single-region providers.
    fn locations(&self) -> &[String];

    /// The location this instance is pinned to, if enumeration selected one.
    fn selected_location(&self) -> Option<&str>;

    /// A copy of this provider pinned to `location`.
    fn at_location(&self, location: &str) -> Self;

    fn parameter_mappings(&self) -> &BTreeMap<String, ParameterMapping>;

    /// True when every declared environment reference is usable right now.
    fn has_valid_env(&self, env: &dyn Environment) -> bool {
        self.env_refs()
            .iter()
            .all(|(_, reference)| reference.is_valid(env))
    }

    /// The selected location, defaulting to the first declared one.
    fn current(&self) -> Option<&str> {
        self.selected_location()
            .or_else(|| self.locations().first().map(|s| s.as_str()))
    }

    /// Enumerates the concrete instances of this provider.
    ///
    /// Yields nothing when the environment is invalid. Otherwise yields one instance
    /// per declared location, or the provider itself when it has no locations or is
    /// already pinned to one.
    fn iter(&self, env: &dyn Environment) -> Instances<'_, Self>
    where
        Self: Sized,
    {
        Instances::new(self, env)
    }

    /// Renames or drops standard parameters for this provider. Parameters without a
    /// mapping pass through unchanged.
    fn map_parameters(&self, params: &ParameterMap) -> ParameterMap {
        let mappings = self.parameter_mappings();
        let mut mapped = ParameterMap::new();

        for (name, value) in params {
            match mappings.get(name) {
                Some(mapping) if !mapping.supported => continue,
                Some(mapping) => {
                    let key = mapping.name.as_deref().unwrap_or(name);
                    mapped.insert(key.to_string(), value.clone());
                }
                None => {
                    mapped.insert(name.clone(), value.clone());
                }
            }
        }

        mapped
    }
}

enum Plan {
    Done,
    Whole,
    Regions(usize),
}

/// Lazy enumeration of a provider's concrete instances, see [`Provider::iter`].
pub struct Instances<'a, P> {
    provider: &'a P,
    plan: Plan,
}

impl<'a, P: Provider> Instances<'a, P> {
    fn new(provider: &'a P, env: &dyn Environment) -> Instances<'a, P> {
        let plan = if !provider.has_valid_env(env) {
            Plan::Done
        } else if provider.selected_location().is_some() || provider.locations().is_empty() {
            Plan::Whole
        } else {
            Plan::Regions(0)
        };

        Instances { provider, plan }
    }
}

impl<'a, P: Provider> Iterator for Instances<'a, P> {
    type Item = P;

    fn next(&mut self) -> Option<P> {
        match self.plan {
            Plan::Done => None,
            Plan::Whole => {
                self.plan = Plan::Done;
                Some(self.provider.clone())
            }
            Plan::Regions(index) => match self.provider.locations().get(index) {
                Some(location) => {
                    self.plan = Plan::Regions(index + 1);
                    Some(self.provider.at_location(location))
                }
                None => {
                    self.plan = Plan::Done;
                    None
                }
            },
        }
    }
}
