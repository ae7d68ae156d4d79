use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::parameters::ValidationMode;
use crate::presets::Preset;

/// Overrides `validation_mode` from the configuration file.
pub const VALIDATION_MODE_VAR: &str = "MODELROUTE_VALIDATION_MODE";

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Root of the `providers/`, `models/` and `presets/` directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_dir: Option<PathBuf>,
    pub validation_mode: ValidationMode,
    /// Seed the model registry with the embedded catalogue
    pub builtin_models: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub presets: BTreeMap<String, Preset>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            config_dir: None,
            validation_mode: ValidationMode::default(),
            builtin_models: true,
            presets: BTreeMap::new(),
        }
    }
}

fn get_config_path(env: &dyn Environment) -> Option<PathBuf> {
    if let Some(home) = env.var("HOME") {
        let home = PathBuf::from(home);

        const USER_PATHS: [&str; 2] = [".config/modelroute/config.toml", ".modelroute.toml"];

        for &path in USER_PATHS.iter() {
            let fullpath = home.join(path);

            if fullpath.exists() {
                return Some(fullpath);
            }
        }
    }

    let system_config = PathBuf::from("/etc/modelroute.toml");

    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

fn parse_config<S: serde::de::DeserializeOwned>(config: &str) -> Result<S> {
    toml::de::from_str(config).map_err(|err| Error::Config(format!("failed to parse config: {}", err)))
}

fn extra_fields_helper<'a>(
    path: &mut Vec<&'a String>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
    extra: &mut Vec<String>,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        if let Some(config_value) = config.get(user_key) {
            if let (toml::Value::Table(user_value), toml::Value::Table(config_value)) =
                (user_value, config_value)
            {
                extra_fields_helper(path, user_value, config_value, extra)
            }
        } else {
            let path: Vec<&str> = path.iter().map(|&s| s.as_str()).collect();

            extra.push(path.join("."));
        }

        path.pop();
    }
}

/// Dotted paths of keys in `raw_config` that `config` does not carry.
fn extra_fields(config: &Config, raw_config: &str) -> Result<Vec<String>> {
    let user_config: toml::Table = parse_config(raw_config)?;

    let config: toml::Table = {
        let serialized_config = toml::ser::to_string(config)
            .map_err(|err| Error::Config(format!("failed to reserialize config: {}", err)))?;

        parse_config(&serialized_config)?
    };

    let mut path = Vec::new();
    let mut extra = Vec::new();

    extra_fields_helper(&mut path, &user_config, &config, &mut extra);

    Ok(extra)
}

impl Config {
    pub fn parse(raw_config: &str) -> Result<Config> {
        let config: Config = parse_config(raw_config)?;

        for key in extra_fields(&config, raw_config)? {
            warn!("config contains extraneous key \"{}\", ignoring", key);
        }

        Ok(config)
    }

    /// Applies environment overrides on top of the file.
    pub fn apply_env(&mut self, env: &dyn Environment) -> Result<()> {
        if let Some(raw) = env.var(VALIDATION_MODE_VAR) {
            self.validation_mode = ValidationMode::from_str(raw.trim()).map_err(|_| {
                Error::Config(format!(
                    "{} must be one of error, warn or clamp, got \"{}\"",
                    VALIDATION_MODE_VAR, raw
                ))
            })?;
        }

        Ok(())
    }
}

/// Reads the configuration at `config`, or at the first search path that exists:
/// `$HOME/.config/modelroute/config.toml`, `$HOME/.modelroute.toml`, then
/// `/etc/modelroute.toml`. A missing file means defaults.
pub fn read_config(config: Option<PathBuf>, env: &dyn Environment) -> Result<Config> {
    let config_path = config.or_else(|| get_config_path(env));

    let mut config = match config_path {
        Some(path) => {
            let raw_config = std::fs::read_to_string(&path).map_err(|err| {
                Error::Config(format!("failed to read {}: {}", path.display(), err))
            })?;

            Config::parse(&raw_config)?
        }
        None => Config::default(),
    };

    config.apply_env(env)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const RAW: &str = r#"
config_dir = "/srv/models"
validation_mode = "clamp"
builtin_models = false

[presets.fast]
title = "Fast"
required_capabilities = ["vision"]
models = ["gemini-2.0-flash", "gpt-4o-mini"]

[presets.fast.parameters]
temperature = 0.2
"#;

    #[test]
    fn parses_every_key() {
        let config = Config::parse(RAW).unwrap();

        assert_eq!(config.config_dir, Some(PathBuf::from("/srv/models")));
        assert_eq!(config.validation_mode, ValidationMode::Clamp);
        assert!(!config.builtin_models);

        let fast = &config.presets["fast"];
        assert_eq!(fast.title, "Fast");
        assert_eq!(fast.models.len(), 2);
        assert!(fast.parameters.is_some());
    }

    #[test]
    fn defaults_when_empty() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.config_dir, None);
        assert_eq!(config.validation_mode, ValidationMode::Error);
        assert!(config.builtin_models);
        assert!(config.presets.is_empty());
    }

    #[test]
    fn reports_extra_fields() {
        let raw = "validation_mode = \"warn\"\neditor = \"vim\"\n[presets.a]\nmodels = []\ncolour = 1\n";
        let config: Config = parse_config(raw).unwrap();

        let extra = extra_fields(&config, raw).unwrap();

        assert_eq!(extra, ["editor", "presets.a.colour"]);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(
            Config::parse("validation_mode = \"sometimes\"").unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn environment_overrides_validation_mode() {
        let mut config = Config::default();
        let mut env = HashMap::new();

        env.insert(VALIDATION_MODE_VAR.to_string(), "warn".to_string());
        config.apply_env(&env).unwrap();
        assert_eq!(config.validation_mode, ValidationMode::Warn);

        env.insert(VALIDATION_MODE_VAR.to_string(), "loud".to_string());
        assert!(config.apply_env(&env).is_err());
    }

    #[test]
    fn reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "builtin_models = false\n").unwrap();

        let env: HashMap<String, String> = HashMap::new();
        let config = read_config(Some(path), &env).unwrap();

        assert!(!config.builtin_models);
    }
}
