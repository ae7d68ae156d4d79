use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use super::validation::{ParameterType, ValidationMode, ValidationRule};
use crate::error::{Error, Result};

/// How a model supports a parameter.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParameterVariant {
    /// Always sent with the declared value; overrides are rejected
    Fixed,
    /// Adjustable by the caller within the validation rule
    #[default]
    Variable,
    /// Never forwarded to a provider
    Unsupported,
}

/// A caller-side setting for one parameter.
///
/// `Default` asks for the declared value, `Explicit` supplies a value, and `Omitted`
/// asks for the field to be left out of the request altogether. In YAML an absent key
/// is `Default` and `null` is `Omitted`.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Setting<T> {
    #[default]
    Default,
    Explicit(T),
    Omitted,
}

impl<T> Setting<T> {
    pub fn is_default(&self) -> bool {
        matches!(self, Setting::Default)
    }
}

impl<T> From<T> for Setting<T> {
    fn from(value: T) -> Self {
        Setting::Explicit(value)
    }
}

impl<T: Serialize> Serialize for Setting<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Setting::Explicit(value) => serializer.serialize_some(value),
            Setting::Default | Setting::Omitted => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Setting::Explicit(value),
            None => Setting::Omitted,
        })
    }
}

/// A declared parameter: its support level, its value and an optional rule.
///
/// A `value` of `None` is "not given": the provider accepts the field being absent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParameterValue<T> {
    #[serde(default)]
    pub variant: ParameterVariant,
    #[serde(default = "Option::default")]
    pub value: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_rule: Option<ValidationRule>,
}

impl<T> Default for ParameterValue<T> {
    fn default() -> Self {
        ParameterValue {
            variant: ParameterVariant::Variable,
            value: None,
            validation_rule: None,
        }
    }
}

struct Shown<'a, T>(&'a Option<T>);

impl<T: fmt::Debug> fmt::Display for Shown<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{:?}", value),
            None => write!(f, "<not given>"),
        }
    }
}

impl<T: ParameterType> ParameterValue<T> {
    pub fn fixed(value: T) -> ParameterValue<T> {
        ParameterValue {
            variant: ParameterVariant::Fixed,
            value: Some(value),
            validation_rule: None,
        }
    }

    pub fn variable(value: Option<T>) -> ParameterValue<T> {
        ParameterValue {
            variant: ParameterVariant::Variable,
            value,
            validation_rule: None,
        }
    }

    pub fn unsupported() -> ParameterValue<T> {
        ParameterValue {
            variant: ParameterVariant::Unsupported,
            value: None,
            validation_rule: None,
        }
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> ParameterValue<T> {
        self.validation_rule = Some(rule);
        self
    }

    pub fn is_supported(&self) -> bool {
        self.variant != ParameterVariant::Unsupported
    }

    /// The value that would be sent to a provider, if any.
    pub fn forwarded(&self) -> Option<&T> {
        match self.variant {
            ParameterVariant::Unsupported => None,
            _ => self.value.as_ref(),
        }
    }

    /// Resolves a caller setting, rejecting any rule violation.
    pub fn resolve(&self, name: &str, setting: &Setting<T>) -> Result<Option<T>> {
        self.resolve_with(name, setting, ValidationMode::Error)
    }

    /// Resolves a caller setting against this declaration.
    ///
    /// Unsupported parameters always resolve to "not given", silently dropping any
    /// explicit value. Fixed parameters resolve to their declared value and reject
    /// any different setting. Variable parameters take the setting after it passes the
    /// validation rule; `mode` decides what happens when it does not.
    pub fn resolve_with(
        &self,
        name: &str,
        setting: &Setting<T>,
        mode: ValidationMode,
    ) -> Result<Option<T>> {
        match self.variant {
            ParameterVariant::Unsupported => {
                if let Setting::Explicit(value) = setting {
                    debug!(parameter = name, ?value, "dropping unsupported parameter");
                }

                Ok(None)
            }
            ParameterVariant::Fixed => {
                let offered = match setting {
                    Setting::Default => return Ok(self.value.clone()),
                    Setting::Explicit(value) => Some(value.clone()),
                    Setting::Omitted => None,
                };

                if offered == self.value {
                    Ok(offered)
                } else {
                    Err(Error::ParameterOverrideRejected {
                        parameter: name.to_string(),
                        declared: Shown(&self.value).to_string(),
                        offered: Shown(&offered).to_string(),
                    })
                }
            }
            ParameterVariant::Variable => match setting {
                Setting::Default => Ok(self.value.clone()),
                Setting::Omitted => Ok(None),
                Setting::Explicit(value) => self.validated(name, value, mode),
            },
        }
    }

    fn validated(&self, name: &str, value: &T, mode: ValidationMode) -> Result<Option<T>> {
        let rule = match &self.validation_rule {
            Some(rule) => rule,
            None => return Ok(Some(value.clone())),
        };

        let reason = match rule.check(value) {
            Ok(()) => return Ok(Some(value.clone())),
            Err(reason) => reason,
        };

        match mode {
            ValidationMode::Error => Err(Error::InvalidParameterValue {
                parameter: name.to_string(),
                value: format!("{:?}", value),
                reason,
            }),
            ValidationMode::Clamp => match rule.clamp(value) {
                Some(clamped) => {
                    warn!(parameter = name, ?value, ?clamped, "clamping parameter: {}", reason);
                    Ok(Some(clamped))
                }
                None => {
                    warn!(parameter = name, ?value, "ignoring parameter: {}", reason);
                    Ok(self.value.clone())
                }
            },
            ValidationMode::Warn => {
                warn!(parameter = name, ?value, "ignoring parameter: {}", reason);
                Ok(self.value.clone())
            }
        }
    }

    /// Applies a caller setting in place. Only variable parameters change; the
    /// setting is still checked against fixed and unsupported declarations.
    pub fn apply(&mut self, name: &str, setting: &Setting<T>, mode: ValidationMode) -> Result<()> {
        let resolved = self.resolve_with(name, setting, mode)?;

        if self.variant == ParameterVariant::Variable {
            self.value = resolved;
        }

        Ok(())
    }
}
