//! The dispatch record handed to a chat client builder.
//!
//! Building the client itself is left to the caller. An [`Invocation`] carries everything
//! it needs from one item of a model or preset enumeration: the ids, the concrete
//! provider and location, the resolved endpoint and credentials, and the parameters
//! under the provider's own names.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use url::Url;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::models::ModelConfiguration;
use crate::parameters::ParameterMap;
use crate::providers::{Provider, ProviderKind};

const REDACTED: &str = "[REDACTED]";

/// A resolved credential. Never shown by `Debug` or serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct Invocation {
    pub model_id: String,
    /// The id the consumer knows the model by
    pub model_alias: String,
    pub provider: ProviderKind,
    pub provider_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<Url>,
    pub credentials: BTreeMap<String, Secret>,
    pub parameters: ParameterMap,
}

impl Invocation {
    /// Builds the record for a configuration carrying exactly one provider.
    ///
    /// Credentials are resolved now, so a variable removed since enumeration fails
    /// here with [`Error::MissingEnvironmentVariable`].
    pub fn from_configuration(
        model: &ModelConfiguration,
        consumer: Option<&str>,
        env: &dyn Environment,
    ) -> Result<Invocation> {
        model.ensure_chat()?;

        let provider = match model.providers.as_slice() {
            [provider] => provider,
            providers => {
                return Err(Error::AmbiguousProvider {
                    model: model.id().to_string(),
                    count: providers.len(),
                })
            }
        };

        let credentials = provider
            .credentials(env)?
            .into_iter()
            .map(|(field, value)| (field, Secret(value)))
            .collect();

        Ok(Invocation {
            model_id: model.id().to_string(),
            model_alias: match consumer {
                Some(consumer) => model.alias_for(consumer).to_string(),
                None => model.id().to_string(),
            },
            provider: provider.kind(),
            provider_name: provider.name().to_string(),
            location: provider.current().map(|s| s.to_string()),
            base_url: provider.base_url(env)?,
            credentials,
            parameters: model.provider_parameters(provider),
        })
    }
}
