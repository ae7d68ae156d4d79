//! Environment references.
//!
//! Credentials and endpoints are never stored in a descriptor directly. Instead a field
//! holds an [`EnvVar`], which is either a literal value or a `$NAME` indirection into an
//! [`Environment`]. The environment is always passed in explicitly so callers can swap
//! the process environment for a fixed table (tests, multi-tenant hosts).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Marks a reference as an indirection rather than a literal.
pub const ENV_MARKER: char = '$';

/// A source of named configuration values.
pub trait Environment {
    /// Returns the value of `name`, or `None` if it is not defined.
    fn var(&self, name: &str) -> Option<String>;
}

/// The environment of the running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        // Non-unicode values are treated as absent
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl Environment for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<E: Environment + ?Sized> Environment for &E {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// A reference to a value that may live in the environment.
///
/// The reference is re-read on every access. Nothing is cached, so a change to the
/// environment is observed by the next [`EnvVar::resolve`] or [`EnvVar::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvVar(String);

impl EnvVar {
    pub fn new(reference: impl Into<String>) -> EnvVar {
        EnvVar(reference.into())
    }

    /// Builds an indirection to the environment entry `name`.
    pub fn named(name: &str) -> EnvVar {
        EnvVar(format!("{}{}", ENV_MARKER, name))
    }

    /// The raw reference, `$NAME` or a literal.
    pub fn reference(&self) -> &str {
        &self.0
    }

    /// The environment entry this reference points to, if it is an indirection.
    pub fn var_name(&self) -> Option<&str> {
        self.0.strip_prefix(ENV_MARKER)
    }

    pub fn is_indirect(&self) -> bool {
        self.var_name().is_some()
    }

    /// Reads the value now. Literals resolve to themselves.
    pub fn resolve(&self, env: &dyn Environment) -> Result<String> {
        match self.var_name() {
            Some(name) => env
                .var(name)
                .ok_or_else(|| Error::MissingEnvironmentVariable(name.to_string())),
            None => Ok(self.0.clone()),
        }
    }

    /// True if the reference is a literal or its entry is present and non-empty.
    pub fn is_valid(&self, env: &dyn Environment) -> bool {
        match self.var_name() {
            Some(name) => env.var(name).map_or(false, |value| !value.is_empty()),
            None => true,
        }
    }
}

impl fmt::Display for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EnvVar {
    fn from(value: &str) -> Self {
        EnvVar::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn literal_resolves_to_itself() {
        let var = EnvVar::new("https://example.com");
        let env = env(&[]);

        assert!(!var.is_indirect());
        assert!(var.is_valid(&env));
        assert_eq!(var.resolve(&env).unwrap(), "https://example.com");
    }

    #[test]
    fn indirection_reads_environment() {
        let var = EnvVar::named("API_KEY");
        let env = env(&[("API_KEY", "secret")]);

        assert_eq!(var.var_name(), Some("API_KEY"));
        assert!(var.is_valid(&env));
        assert_eq!(var.resolve(&env).unwrap(), "secret");
    }

    #[test]
    fn missing_indirection_fails_resolution() {
        let var = EnvVar::named("API_KEY");
        let env = env(&[]);

        assert!(!var.is_valid(&env));

        let err = var.resolve(&env).unwrap_err();
        assert!(matches!(err, Error::MissingEnvironmentVariable(name) if name == "API_KEY"));
    }

    #[test]
    fn empty_value_is_invalid_but_resolvable() {
        let var = EnvVar::named("API_KEY");
        let env = env(&[("API_KEY", "")]);

        assert!(!var.is_valid(&env));
        assert_eq!(var.resolve(&env).unwrap(), "");
    }

    #[test]
    fn value_is_reread_on_each_access() {
        let var = EnvVar::named("REGION");
        let mut env = env(&[]);

        assert!(!var.is_valid(&env));

        env.insert("REGION".to_string(), "eu".to_string());

        assert!(var.is_valid(&env));
        assert_eq!(var.resolve(&env).unwrap(), "eu");
    }

    #[test]
    fn deserializes_from_plain_string() {
        let var: EnvVar = serde_json::from_str("\"$TOKEN\"").unwrap();

        assert_eq!(var, EnvVar::named("TOKEN"));
    }
}
