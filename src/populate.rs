use std::collections::BTreeMap;

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::ModelRegistry;
use crate::presets::{self, Preset};
use crate::providers::ProviderRegistry;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub providers: ProviderRegistry,
    pub models: ModelRegistry,
    pub presets: BTreeMap<String, Preset>,
}

impl Catalog {
    /// Populates every registry. Provider files layer over the built-in providers,
    /// model files over the embedded catalogue, and presets from the configuration
    /// file over preset files.
    pub fn populate(config: &Config) -> Catalog {
        let providers = match &config.config_dir {
            Some(dir) => ProviderRegistry::with_defaults_and_dir(dir),
            None => ProviderRegistry::with_defaults(),
        };

        let mut models = ModelRegistry::new();
        models.set_validation_mode(config.validation_mode);

        if config.builtin_models {
            models.load_builtin(&providers);
        }

        let mut presets = BTreeMap::new();

        if let Some(dir) = &config.config_dir {
            models.load_dir(dir, &providers);
            presets.extend(presets::load_dir(dir));
        }

        presets.extend(config.presets.clone());

        debug!(
            "populated {} providers, {} models and {} presets",
            providers.len(),
            models.len(),
            presets.len()
        );

        Catalog {
            providers,
            models,
            presets,
        }
    }

    pub fn preset(&self, name: &str) -> Result<&Preset> {
        self.presets
            .get(name)
            .ok_or_else(|| Error::PresetNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use super::*;
    use crate::parameters::ValidationMode;
    use crate::providers::{Provider, ProviderKind};

    #[test]
    fn catalog_is_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Catalog>();

        let catalog = Catalog::populate(&Config::default());
        let env: HashMap<String, String> =
            [("OPENAI_API_KEY".to_string(), "key".to_string())].into_iter().collect();
        let preset = Preset::of_models(&["gpt-4o-mini"]);

        std::thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    let items: Vec<_> = preset.iter(&catalog.models, &env).collect();

                    assert_eq!(items.len(), 1);
                    assert!(items[0].is_ok());
                });
            }
        });

        assert_eq!(preset.get_current_model().unwrap().id(), "gpt-4o-mini");
    }

    #[test]
    fn defaults_without_directory() {
        let catalog = Catalog::populate(&Config::default());

        assert_eq!(catalog.models.len(), 8);
        assert!(catalog.presets.is_empty());
        assert!(catalog.providers.get(ProviderKind::Vertex).is_some());
        assert!(matches!(
            catalog.preset("fast").unwrap_err(),
            Error::PresetNotFound(_)
        ));
    }

    #[test]
    fn directory_layers_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["providers", "models", "presets"] {
            fs::create_dir(dir.path().join(sub)).unwrap();
        }

        fs::write(
            dir.path().join("providers/azure.yml"),
            "type: azure\nname: Azure EU\nlocations: [westeurope]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("presets/cheap.yaml"),
            "models: [gpt-4o-mini, deepseek-chat]\n",
        )
        .unwrap();

        let config = Config {
            config_dir: Some(dir.path().to_path_buf()),
            validation_mode: ValidationMode::Warn,
            ..Default::default()
        };

        let catalog = Catalog::populate(&config);

        assert_eq!(catalog.models.validation_mode(), ValidationMode::Warn);
        assert_eq!(catalog.providers.get(ProviderKind::Azure).unwrap().name(), "Azure EU");

        // Models resolve providers through the layered registry
        let mini = catalog.models.get_model("gpt-4o-mini").unwrap();
        assert_eq!(mini.providers[0].locations(), ["westeurope"]);

        let env: HashMap<String, String> = [
            ("AZURE_API_KEY", "key"),
            ("AZURE_BASE_URL", "https://eu.example.com"),
            ("DEEPSEEK_API_KEY", "key"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let cheap = catalog.preset("cheap").unwrap();
        let ids: Vec<(String, Option<String>)> = cheap
            .iter(&catalog.models, &env)
            .map(|m| {
                let m = m.unwrap();
                (m.id().to_string(), m.providers[0].current().map(|s| s.to_string()))
            })
            .collect();

        assert_eq!(
            ids,
            [
                ("gpt-4o-mini".to_string(), Some("westeurope".to_string())),
                ("deepseek-chat".to_string(), None),
            ]
        );
    }
}
