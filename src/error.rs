use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// An indirected environment reference has no backing value
    #[error("environment variable \"{0}\" is not set")]
    MissingEnvironmentVariable(String),
    /// An attempt was made to change a fixed parameter
    #[error("parameter \"{parameter}\" is fixed to {declared}, refusing override {offered}")]
    ParameterOverrideRejected {
        parameter: String,
        declared: String,
        offered: String,
    },
    /// A variable parameter was given a value its validation rule does not allow
    #[error("invalid value {value} for parameter \"{parameter}\": {reason}")]
    InvalidParameterValue {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("provider \"{0}\" not found")]
    ProviderNotFound(String),
    #[error("model \"{0}\" not found")]
    ModelNotFound(String),
    #[error("preset \"{0}\" not found")]
    PresetNotFound(String),
    /// A provider, model or preset file could not be read or parsed
    #[error("failed to load \"{}\": {source}", path.display())]
    ConfigurationLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    /// `get_current_model` was called before a preset yielded anything
    #[error("no model has been selected yet")]
    NoCurrentModel,
    /// A non-chat model was handed to a chat consumer
    #[error("model \"{model}\" is a {mode} model, not a chat model")]
    UnsupportedMode { model: String, mode: String },
    /// A dispatch record needs exactly one concrete provider
    #[error("model \"{model}\" carries {count} providers, expected exactly one")]
    AmbiguousProvider { model: String, count: usize },
    #[error("provider \"{provider}\" has an invalid base URL: {source}")]
    InvalidBaseUrl {
        provider: String,
        #[source]
        source: url::ParseError,
    },
    /// The user configuration could not be read
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn load<E>(path: impl Into<PathBuf>, source: E) -> Error
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error::ConfigurationLoad {
            path: path.into(),
            source: source.into(),
        }
    }
}
