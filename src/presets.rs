//! Presets: named, nestable groups of models.
//!
//! A preset expands into a flat, ordered stream of ready-to-dispatch configurations.
//! Each yielded [`ModelConfiguration`] carries exactly one concrete provider pinned to
//! one location. The stream is built lazily: a model is looked up, filtered and
//! configured only when the consumer pulls past the previous one.
//!
//! ```yaml
//! title: Fast vision
//! required_capabilities: [vision]
//! parameters: { temperature: 0.3 }
//! models:
//!   - gemini-2.0-flash
//!   - models: [gpt-4o-mini, claude-3.7-sonnet]
//!     data_center_fallback: false
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::loader;
use crate::models::{ModelCapability, ModelConfiguration, ModelRegistry};
use crate::parameters::ModelParameters;
use crate::providers::{Provider, ProviderDescriptor};

/// Sub-directory of the configuration directory holding preset files.
pub const PRESETS_DIR: &str = "presets";

/// One member of a preset.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum PresetEntry {
    /// A model id, looked up in the model registry
    Model(String),
    /// A nested group, expanded in place
    Preset(Box<Preset>),
}

fn default_title() -> String {
    "A Model Preset".to_string()
}

fn default_blurb() -> String {
    "A model preset".to_string()
}

fn default_fallback() -> bool {
    true
}

/// The last configuration an expansion yielded, shared across threads.
#[derive(Debug, Default)]
struct CurrentModel(Mutex<Option<ModelConfiguration>>);

impl CurrentModel {
    fn get(&self) -> Option<ModelConfiguration> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, model: ModelConfiguration) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(model);
    }
}

impl Clone for CurrentModel {
    fn clone(&self) -> Self {
        CurrentModel(Mutex::new(self.get()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Preset {
    pub models: Vec<PresetEntry>,
    /// Models lacking any of these are skipped. Empty means no filter.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_capabilities: BTreeSet<ModelCapability>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_blurb")]
    pub subtitle: String,
    #[serde(default = "default_blurb")]
    pub description: String,
    /// Overrides applied to every model of this group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ModelParameters>,
    /// Expose every location of every provider, rather than each provider's default
    /// location only
    #[serde(default = "default_fallback")]
    pub data_center_fallback: bool,
    #[serde(skip)]
    current_model: CurrentModel,
}

type Candidates<'a> = Box<dyn Iterator<Item = Result<ModelConfiguration>> + 'a>;

impl Preset {
    pub fn new(models: Vec<PresetEntry>) -> Preset {
        Preset {
            models,
            required_capabilities: BTreeSet::new(),
            title: default_title(),
            subtitle: default_blurb(),
            description: default_blurb(),
            parameters: None,
            data_center_fallback: default_fallback(),
            current_model: CurrentModel::default(),
        }
    }

    /// A flat preset over model ids.
    pub fn of_models<S: AsRef<str>>(ids: &[S]) -> Preset {
        Preset::new(
            ids.iter()
                .map(|id| PresetEntry::Model(id.as_ref().to_string()))
                .collect(),
        )
    }

    /// Expands the preset against `registry`.
    ///
    /// A model missing from the registry, or one rejecting the preset parameters,
    /// yields an error at its position in the stream. The expansion does not stop
    /// there: the next pull continues with the following entry, so a caller that treats
    /// errors as fatal must stop pulling itself. The walk is restartable: every call
    /// starts from the first entry again.
    pub fn iter<'a>(&'a self, registry: &'a ModelRegistry, env: &'a dyn Environment) -> Expansion<'a> {
        let inner = self
            .models
            .iter()
            .flat_map(move |entry| self.expand(entry, registry, env));

        Expansion {
            preset: self,
            inner: Box::new(inner),
        }
    }

    /// The configuration most recently yielded by an expansion of this preset.
    pub fn get_current_model(&self) -> Result<ModelConfiguration> {
        self.current_model.get().ok_or(Error::NoCurrentModel)
    }

    fn expand<'a>(
        &'a self,
        entry: &'a PresetEntry,
        registry: &'a ModelRegistry,
        env: &'a dyn Environment,
    ) -> Candidates<'a> {
        match entry {
            PresetEntry::Preset(nested) => Box::new(nested.iter(registry, env)),
            PresetEntry::Model(id) => match self.prepare(id, registry) {
                Ok(Some(model)) => Box::new(candidates(model, self.data_center_fallback, env)),
                Ok(None) => Box::new(std::iter::empty()),
                Err(err) => Box::new(std::iter::once(Err(err))),
            },
        }
    }

    /// Looks up and configures one model. `None` when it fails the capability filter.
    fn prepare(&self, id: &str, registry: &ModelRegistry) -> Result<Option<ModelConfiguration>> {
        let model = registry.get_model(id)?;

        if !self.required_capabilities.is_empty()
            && !model.check_capabilities(&self.required_capabilities)
        {
            let required: Vec<String> = self
                .required_capabilities
                .iter()
                .map(|c| c.to_string())
                .collect();

            warn!(
                "model \"{}\" lacks the required capabilities ({}), skipping",
                id,
                required.join(", ")
            );

            return Ok(None);
        }

        let mut model = model.clone();

        if let Some(parameters) = &self.parameters {
            model.set_parameters_with(parameters, registry.validation_mode())?;
        }

        Ok(Some(model))
    }
}

fn candidates(
    model: ModelConfiguration,
    fallback: bool,
    env: &dyn Environment,
) -> impl Iterator<Item = Result<ModelConfiguration>> {
    let providers: Vec<ProviderDescriptor> = if fallback {
        // Every instance from the model is already pinned, so this re-confirms it
        model
            .iter(env)
            .flat_map(|provider| provider.iter(env).collect::<Vec<_>>())
            .collect()
    } else {
        model.iter_default_regions(env).collect()
    };

    providers
        .into_iter()
        .map(move |provider| Ok(model.with_provider(provider)))
}

/// Lazy expansion of a [`Preset`], see [`Preset::iter`].
pub struct Expansion<'a> {
    preset: &'a Preset,
    inner: Candidates<'a>,
}

impl Iterator for Expansion<'_> {
    type Item = Result<ModelConfiguration>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;

        if let Ok(model) = &item {
            self.preset.current_model.set(model.clone());
        }

        Some(item)
    }
}

/// Loads every preset under `<config_dir>/presets/`, named after its file stem.
pub fn load_dir(config_dir: &Path) -> BTreeMap<String, Preset> {
    loader::load_dir(&config_dir.join(PRESETS_DIR))
        .into_iter()
        .collect()
}
