use tracing::warn;

use super::ModelDefinition;

const CATALOG: [(&str, &str); 8] = [
    ("claude-3.7-sonnet", include_str!("builtin/claude-3.7-sonnet.yml")),
    ("claude-4-sonnet", include_str!("builtin/claude-4-sonnet.yml")),
    ("gpt-4o-mini", include_str!("builtin/gpt-4o-mini.yml")),
    ("gpt-4.1", include_str!("builtin/gpt-4.1.yml")),
    ("gemini-2.0-flash", include_str!("builtin/gemini-2.0-flash.yml")),
    ("deepseek-chat", include_str!("builtin/deepseek-chat.yml")),
    ("deepseek-reasoner", include_str!("builtin/deepseek-reasoner.yml")),
    ("perplexity-sonar-large", include_str!("builtin/perplexity-sonar-large.yml")),
];

/// The embedded catalogue, in declaration order.
pub fn builtin_definitions() -> Vec<(&'static str, ModelDefinition)> {
    CATALOG
        .iter()
        .filter_map(|(name, raw)| match serde_yml::from_str(raw) {
            Ok(definition) => Some((*name, definition)),
            Err(err) => {
                warn!("failed to parse built-in model \"{}\": {}", name, err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::ParameterVariant;
    use crate::providers::ProviderRegistry;

    #[test]
    fn every_entry_parses_under_its_own_id() {
        let definitions = builtin_definitions();

        assert_eq!(definitions.len(), CATALOG.len());

        for (name, definition) in &definitions {
            assert_eq!(*name, definition.model.identity.id);
        }
    }

    #[test]
    fn every_entry_resolves_against_defaults() {
        let providers = ProviderRegistry::with_defaults();

        for (name, definition) in builtin_definitions() {
            let model = definition.into_configuration(&providers).unwrap();

            assert!(!model.providers.is_empty(), "{} has no providers", name);
        }
    }

    #[test]
    fn declared_variants_survive_parsing() {
        let (_, sonnet) = builtin_definitions()
            .into_iter()
            .find(|(name, _)| *name == "claude-3.7-sonnet")
            .unwrap();

        let params = &sonnet.model.parameters;
        assert_eq!(params.top_k.variant, ParameterVariant::Fixed);
        assert_eq!(params.top_k.value, Some(40));
        assert_eq!(params.seed.variant, ParameterVariant::Unsupported);
        assert_eq!(params.temperature.value, Some(0.0));
    }
}
