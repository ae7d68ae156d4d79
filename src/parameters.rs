//! Generation parameters.
//!
//! A model declares a [`ConfigurableParameters`] set: every known parameter with its
//! support level ([`ParameterVariant`]), default value and optional [`ValidationRule`].
//! Callers and presets adjust it with a [`ModelParameters`] override set. Once resolved,
//! the parameters are flattened into a [`ParameterMap`] which a provider then renames or
//! filters through its parameter mappings.

mod validation;
mod value;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use validation::{ParameterType, ValidationMode, ValidationRule};
pub use value::{ParameterValue, ParameterVariant, Setting};

/// Resolved parameters keyed by their request field name.
pub type ParameterMap = BTreeMap<String, serde_json::Value>;

/// Every parameter a model declares, with its support level.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ConfigurableParameters {
    pub temperature: ParameterValue<f64>,
    pub top_p: ParameterValue<f64>,
    pub top_k: ParameterValue<i64>,
    pub frequency_penalty: ParameterValue<f64>,
    pub presence_penalty: ParameterValue<f64>,
    pub max_tokens: ParameterValue<i64>,
    pub stop: ParameterValue<Vec<String>>,
    pub seed: ParameterValue<i64>,
    pub reasoning_effort: ParameterValue<String>,
}

/// Caller overrides for a [`ConfigurableParameters`] set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ModelParameters {
    #[serde(skip_serializing_if = "Setting::is_default")]
    pub temperature: Setting<f64>,
    #[serde(skip_serializing_if = "Setting::is_default")]
    pub top_p: Setting<f64>,
    #[serde(skip_serializing_if = "Setting::is_default")]
    pub top_k: Setting<i64>,
    #[serde(skip_serializing_if = "Setting::is_default")]
    pub frequency_penalty: Setting<f64>,
    #[serde(skip_serializing_if = "Setting::is_default")]
    pub presence_penalty: Setting<f64>,
    #[serde(skip_serializing_if = "Setting::is_default")]
    pub max_tokens: Setting<i64>,
    #[serde(skip_serializing_if = "Setting::is_default")]
    pub stop: Setting<Vec<String>>,
    #[serde(skip_serializing_if = "Setting::is_default")]
    pub seed: Setting<i64>,
    #[serde(skip_serializing_if = "Setting::is_default")]
    pub reasoning_effort: Setting<String>,
}

fn insert<T: ParameterType>(map: &mut ParameterMap, name: &str, param: &ParameterValue<T>) {
    if let Some(value) = param.forwarded() {
        map.insert(name.to_string(), value.to_json());
    }
}

impl ConfigurableParameters {
    /// Applies `overrides` under `mode`. Either every override is applied or, on the
    /// first failure, none is.
    pub fn set_parameters(&mut self, overrides: &ModelParameters, mode: ValidationMode) -> Result<()> {
        let mut next = self.clone();

        next.temperature
            .apply("temperature", &overrides.temperature, mode)?;
        next.top_p.apply("top_p", &overrides.top_p, mode)?;
        next.top_k.apply("top_k", &overrides.top_k, mode)?;
        next.frequency_penalty
            .apply("frequency_penalty", &overrides.frequency_penalty, mode)?;
        next.presence_penalty
            .apply("presence_penalty", &overrides.presence_penalty, mode)?;
        next.max_tokens
            .apply("max_tokens", &overrides.max_tokens, mode)?;
        next.stop.apply("stop", &overrides.stop, mode)?;
        next.seed.apply("seed", &overrides.seed, mode)?;
        next.reasoning_effort
            .apply("reasoning_effort", &overrides.reasoning_effort, mode)?;

        *self = next;

        Ok(())
    }

    /// The parameters that would be forwarded, under their standard names.
    /// Unsupported and not-given parameters are absent.
    pub fn resolved(&self) -> ParameterMap {
        let mut map = ParameterMap::new();

        insert(&mut map, "temperature", &self.temperature);
        insert(&mut map, "top_p", &self.top_p);
        insert(&mut map, "top_k", &self.top_k);
        insert(&mut map, "frequency_penalty", &self.frequency_penalty);
        insert(&mut map, "presence_penalty", &self.presence_penalty);
        insert(&mut map, "max_tokens", &self.max_tokens);
        insert(&mut map, "stop", &self.stop);
        insert(&mut map, "seed", &self.seed);
        insert(&mut map, "reasoning_effort", &self.reasoning_effort);

        map
    }
}

fn parse_setting<T, F>(name: &str, raw: &str, parse: F) -> Result<Setting<T>>
where
    F: FnOnce(&str) -> Option<T>,
{
    match raw.trim() {
        "default" => Ok(Setting::Default),
        "omit" | "null" => Ok(Setting::Omitted),
        raw => parse(raw)
            .map(Setting::Explicit)
            .ok_or_else(|| Error::InvalidParameterValue {
                parameter: name.to_string(),
                value: raw.to_string(),
                reason: "could not be parsed".to_string(),
            }),
    }
}

impl ModelParameters {
    /// Sets one override from its textual form, as given on the command line.
    ///
    /// `omit` (or `null`) requests the field be left out and `default` restores the
    /// declared value. `stop` takes a comma-separated list.
    pub fn set_from_str(&mut self, name: &str, raw: &str) -> Result<()> {
        let float = |s: &str| s.parse::<f64>().ok();
        let int = |s: &str| s.parse::<i64>().ok();

        match name {
            "temperature" => self.temperature = parse_setting(name, raw, float)?,
            "top_p" => self.top_p = parse_setting(name, raw, float)?,
            "top_k" => self.top_k = parse_setting(name, raw, int)?,
            "frequency_penalty" => self.frequency_penalty = parse_setting(name, raw, float)?,
            "presence_penalty" => self.presence_penalty = parse_setting(name, raw, float)?,
            "max_tokens" => self.max_tokens = parse_setting(name, raw, int)?,
            "stop" => {
                self.stop = parse_setting(name, raw, |s| {
                    Some(s.split(',').map(|part| part.trim().to_string()).collect())
                })?
            }
            "seed" => self.seed = parse_setting(name, raw, int)?,
            "reasoning_effort" => {
                self.reasoning_effort = parse_setting(name, raw, |s| Some(s.to_string()))?
            }
            _ => {
                return Err(Error::InvalidParameterValue {
                    parameter: name.to_string(),
                    value: raw.to_string(),
                    reason: "unknown parameter".to_string(),
                })
            }
        }

        Ok(())
    }
}
