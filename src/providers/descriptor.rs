//! Concrete provider descriptors, discriminated by their `type` field

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use super::{ParameterMapping, Provider, ProviderKind};
use crate::env::{EnvVar, Environment};
use crate::error::{Error, Result};

/// Settings for providers authenticated by a single API key.
///
/// Every OpenAI-compatible backend shares this shape; only the defaults differ, and
/// those come from the [`ProviderKind`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ApiKeyBackend {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<EnvVar>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AzureBackend {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<EnvVar>,
    #[serde(default = "azure_locations")]
    pub locations: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VertexBackend {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EnvVar>,
    /// Family of models served through this deployment (e.g. `claude`, `gemini`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_family: Option<String>,
    #[serde(default = "vertex_locations")]
    pub locations: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BedrockBackend {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<EnvVar>,
    #[serde(default = "bedrock_locations")]
    pub locations: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn azure_locations() -> Vec<String> {
    strings(&["eastus", "eastus2"])
}

fn vertex_locations() -> Vec<String> {
    strings(&["us-central1", "us-east5", "europe-west1"])
}

fn bedrock_locations() -> Vec<String> {
    strings(&["us-east-1", "us-west-2"])
}

impl Default for AzureBackend {
    fn default() -> Self {
        AzureBackend {
            api_key: None,
            base_url: None,
            locations: azure_locations(),
        }
    }
}

impl Default for VertexBackend {
    fn default() -> Self {
        VertexBackend {
            project_id: None,
            model_family: None,
            locations: vertex_locations(),
        }
    }
}

impl Default for BedrockBackend {
    fn default() -> Self {
        BedrockBackend {
            access_key_id: None,
            secret_access_key: None,
            locations: bedrock_locations(),
        }
    }
}

/// Backend-specific settings, selected by the `type` field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Backend {
    OpenAI(ApiKeyBackend),
    Azure(AzureBackend),
    Anthropic(ApiKeyBackend),
    Vertex(VertexBackend),
    Bedrock(BedrockBackend),
    OpenRouter(ApiKeyBackend),
    DeepSeek(ApiKeyBackend),
    Perplexity(ApiKeyBackend),
    Together(ApiKeyBackend),
    Fireworks(ApiKeyBackend),
    Grok(ApiKeyBackend),
    Groq(ApiKeyBackend),
    Mistral(ApiKeyBackend),
}

fn or_named(reference: &Option<EnvVar>, name: &str) -> EnvVar {
    reference.clone().unwrap_or_else(|| EnvVar::named(name))
}

impl Backend {
    /// Default settings for `kind`.
    pub fn new(kind: ProviderKind) -> Backend {
        let key = ApiKeyBackend::default();

        match kind {
            ProviderKind::OpenAI => Backend::OpenAI(key),
            ProviderKind::Azure => Backend::Azure(AzureBackend::default()),
            ProviderKind::Anthropic => Backend::Anthropic(key),
            ProviderKind::Vertex => Backend::Vertex(VertexBackend::default()),
            ProviderKind::Bedrock => Backend::Bedrock(BedrockBackend::default()),
            ProviderKind::OpenRouter => Backend::OpenRouter(key),
            ProviderKind::DeepSeek => Backend::DeepSeek(key),
            ProviderKind::Perplexity => Backend::Perplexity(key),
            ProviderKind::Together => Backend::Together(key),
            ProviderKind::Fireworks => Backend::Fireworks(key),
            ProviderKind::Grok => Backend::Grok(key),
            ProviderKind::Groq => Backend::Groq(key),
            ProviderKind::Mistral => Backend::Mistral(key),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Backend::OpenAI(_) => ProviderKind::OpenAI,
            Backend::Azure(_) => ProviderKind::Azure,
            Backend::Anthropic(_) => ProviderKind::Anthropic,
            Backend::Vertex(_) => ProviderKind::Vertex,
            Backend::Bedrock(_) => ProviderKind::Bedrock,
            Backend::OpenRouter(_) => ProviderKind::OpenRouter,
            Backend::DeepSeek(_) => ProviderKind::DeepSeek,
            Backend::Perplexity(_) => ProviderKind::Perplexity,
            Backend::Together(_) => ProviderKind::Together,
            Backend::Fireworks(_) => ProviderKind::Fireworks,
            Backend::Grok(_) => ProviderKind::Grok,
            Backend::Groq(_) => ProviderKind::Groq,
            Backend::Mistral(_) => ProviderKind::Mistral,
        }
    }

    fn env_refs(&self) -> Vec<(&'static str, EnvVar)> {
        let kind = self.kind();

        match self {
            Backend::Azure(azure) => vec![
                ("api_key", or_named(&azure.api_key, "AZURE_API_KEY")),
                ("base_url", or_named(&azure.base_url, "AZURE_BASE_URL")),
            ],
            Backend::Vertex(vertex) => {
                vec![("project_id", or_named(&vertex.project_id, "VERTEX_PROJECT_ID"))]
            }
            Backend::Bedrock(bedrock) => vec![
                (
                    "access_key_id",
                    or_named(&bedrock.access_key_id, "AWS_ACCESS_KEY_ID"),
                ),
                (
                    "secret_access_key",
                    or_named(&bedrock.secret_access_key, "AWS_SECRET_ACCESS_KEY"),
                ),
            ],
            Backend::OpenAI(key)
            | Backend::Anthropic(key)
            | Backend::OpenRouter(key)
            | Backend::DeepSeek(key)
            | Backend::Perplexity(key)
            | Backend::Together(key)
            | Backend::Fireworks(key)
            | Backend::Grok(key)
            | Backend::Groq(key)
            | Backend::Mistral(key) => {
                let mut refs = Vec::new();

                if let Some(var) = kind.api_key_var() {
                    refs.push(("api_key", or_named(&key.api_key, var)));
                }

                let base_url = key
                    .base_url
                    .clone()
                    .or_else(|| kind.default_base_url().map(EnvVar::new));

                if let Some(base_url) = base_url {
                    refs.push(("base_url", base_url));
                }

                refs
            }
        }
    }

    fn locations(&self) -> &[String] {
        match self {
            Backend::Azure(azure) => &azure.locations,
            Backend::Vertex(vertex) => &vertex.locations,
            Backend::Bedrock(bedrock) => &bedrock.locations,
            _ => &[],
        }
    }
}

/// A provider as declared in code or in a provider file.
///
/// In YAML the backend fields sit next to the common ones:
///
/// ```yaml
/// type: azure
/// name: Azure (EU)
/// api_key: $AZURE_EU_KEY
/// locations: [westeurope, northeurope]
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProviderDescriptor {
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameter_mappings: BTreeMap<String, ParameterMapping>,
    #[serde(flatten)]
    pub backend: Backend,
    #[serde(skip)]
    selected: Option<String>,
}

impl ProviderDescriptor {
    /// The default descriptor for `kind`.
    pub fn new(kind: ProviderKind) -> ProviderDescriptor {
        ProviderDescriptor::from_backend(Backend::new(kind))
    }

    pub fn from_backend(backend: Backend) -> ProviderDescriptor {
        ProviderDescriptor {
            display_name: None,
            parameter_mappings: BTreeMap::new(),
            backend,
            selected: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> ProviderDescriptor {
        self.display_name = Some(name.to_string());
        self
    }

    /// Drops the selected location, returning to the default one.
    pub fn reset_variants(&mut self) {
        self.selected = None;
    }

    /// Resolves the endpoint, if the provider has one.
    pub fn base_url(&self, env: &dyn Environment) -> Result<Option<Url>> {
        let reference = self
            .env_refs()
            .into_iter()
            .find(|(field, _)| *field == "base_url");

        let raw = match reference {
            Some((_, reference)) => reference.resolve(env)?,
            None => return Ok(None),
        };

        Url::parse(&raw)
            .map(Some)
            .map_err(|source| Error::InvalidBaseUrl {
                provider: self.kind().to_string(),
                source,
            })
    }

    /// Resolves every credential the provider declares, excluding its endpoint.
    pub fn credentials(&self, env: &dyn Environment) -> Result<BTreeMap<String, String>> {
        self.env_refs()
            .into_iter()
            .filter(|(field, _)| *field != "base_url")
            .map(|(field, reference)| Ok((field.to_string(), reference.resolve(env)?)))
            .collect()
    }
}

impl Provider for ProviderDescriptor {
    fn kind(&self) -> ProviderKind {
        self.backend.kind()
    }

    fn name(&self) -> &str {
        match &self.display_name {
            Some(name) => name,
            None => self.kind().default_name(),
        }
    }

    fn env_refs(&self) -> Vec<(&'static str, EnvVar)> {
        self.backend.env_refs()
    }

    fn locations(&self) -> &[String] {
        self.backend.locations()
    }

    fn selected_location(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn at_location(&self, location: &str) -> Self {
        let mut pinned = self.clone();
        pinned.selected = Some(location.to_string());
        pinned
    }

    fn parameter_mappings(&self) -> &BTreeMap<String, ParameterMapping> {
        &self.parameter_mappings
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_tagged_yaml() {
        let raw = "type: azure\nname: Azure EU\napi_key: $AZURE_EU_KEY\nlocations: [westeurope]\n";
        let provider: ProviderDescriptor = serde_yml::from_str(raw).unwrap();

        assert_eq!(provider.kind(), ProviderKind::Azure);
        assert_eq!(provider.name(), "Azure EU");
        assert_eq!(provider.locations(), ["westeurope"]);

        let refs = provider.env_refs();
        assert_eq!(refs[0], ("api_key", EnvVar::named("AZURE_EU_KEY")));
        assert_eq!(refs[1], ("base_url", EnvVar::named("AZURE_BASE_URL")));
    }

    #[test]
    fn missing_fields_take_kind_defaults() {
        let provider: ProviderDescriptor = serde_yml::from_str("type: vertex\n").unwrap();

        assert_eq!(provider, ProviderDescriptor::new(ProviderKind::Vertex));
        assert_eq!(provider.name(), "Vertex AI");
        assert_eq!(provider.current(), Some("us-central1"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let parsed = serde_yml::from_str::<ProviderDescriptor>("type: carrier_pigeon\n");

        assert!(parsed.is_err());
    }

    #[test]
    fn base_url_defaults_per_kind() {
        let env = env(&[]);

        let deepseek = ProviderDescriptor::new(ProviderKind::DeepSeek);
        assert_eq!(
            deepseek.base_url(&env).unwrap().unwrap().as_str(),
            "https://api.deepseek.com/"
        );

        let anthropic = ProviderDescriptor::new(ProviderKind::Anthropic);
        assert_eq!(anthropic.base_url(&env).unwrap(), None);
    }

    #[test]
    fn base_url_through_environment() {
        let azure = ProviderDescriptor::new(ProviderKind::Azure);

        let err = azure.base_url(&env(&[])).unwrap_err();
        assert!(matches!(err, Error::MissingEnvironmentVariable(_)));

        let err = azure
            .base_url(&env(&[("AZURE_BASE_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBaseUrl { .. }));

        let url = azure
            .base_url(&env(&[("AZURE_BASE_URL", "https://contoso.openai.azure.com")]))
            .unwrap();
        assert_eq!(url.unwrap().host_str(), Some("contoso.openai.azure.com"));
    }

    #[test]
    fn credentials_exclude_endpoint() {
        let bedrock = ProviderDescriptor::new(ProviderKind::Bedrock);
        let env = env(&[("AWS_ACCESS_KEY_ID", "id"), ("AWS_SECRET_ACCESS_KEY", "secret")]);

        let credentials = bedrock.credentials(&env).unwrap();

        assert_eq!(credentials.len(), 2);
        assert_eq!(credentials["access_key_id"], "id");
        assert!(bedrock.has_valid_env(&env));
    }

    #[test]
    fn literal_base_url_is_always_valid() {
        let provider: ProviderDescriptor =
            serde_yml::from_str("type: openai\napi_key: $KEY\nbase_url: http://localhost:8080/v1\n")
                .unwrap();

        assert!(provider.has_valid_env(&env(&[("KEY", "k")])));
    }
}
