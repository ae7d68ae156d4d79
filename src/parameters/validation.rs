//! Validation rules attached to variable parameters

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A value type that can be carried by a [`super::ParameterValue`].
///
/// Rules are checked through the numeric or textual view of a value. A value that has
/// neither view cannot satisfy any rule.
pub trait ParameterType: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {
    fn as_number(&self) -> Option<f64> {
        None
    }

    fn as_text(&self) -> Option<&str> {
        None
    }

    /// Pulls `number` into `[min, max]` and rebuilds a value from it.
    /// The bounds are already known to be ordered.
    fn clamp_number(_number: f64, _min: f64, _max: f64) -> Option<Self> {
        None
    }

    fn to_json(&self) -> serde_json::Value;
}

impl ParameterType for f64 {
    fn as_number(&self) -> Option<f64> {
        Some(*self)
    }

    fn clamp_number(number: f64, min: f64, max: f64) -> Option<Self> {
        Some(number.clamp(min, max))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(*self)
    }
}

impl ParameterType for i64 {
    fn as_number(&self) -> Option<f64> {
        Some(*self as f64)
    }

    fn clamp_number(number: f64, min: f64, max: f64) -> Option<Self> {
        // Integer bounds lie inside the float ones
        let (min, max) = (min.ceil(), max.floor());

        if min > max {
            return None;
        }

        Some(number.clamp(min, max) as i64)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(*self)
    }
}

impl ParameterType for String {
    fn as_text(&self) -> Option<&str> {
        Some(self)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self.as_str())
    }
}

impl ParameterType for Vec<String> {
    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self.clone())
    }
}

/// Constrains the values a variable parameter accepts.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub enum ValidationRule {
    /// Inclusive numeric bounds
    Range { min_value: f64, max_value: f64 },
    /// A closed set of textual values
    Enum { allowed_values: Vec<String> },
}

/// Wire form of [`ValidationRule`], checked on the way in.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawRule {
    Range { min_value: f64, max_value: f64 },
    Enum { allowed_values: Vec<String> },
}

impl TryFrom<RawRule> for ValidationRule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        match raw {
            RawRule::Range {
                min_value,
                max_value,
            } => {
                // Also false for NaN bounds
                if min_value <= max_value {
                    Ok(ValidationRule::Range {
                        min_value,
                        max_value,
                    })
                } else {
                    Err(format!(
                        "invalid range [{}, {}], min_value must not exceed max_value",
                        min_value, max_value
                    ))
                }
            }
            RawRule::Enum { allowed_values } => Ok(ValidationRule::Enum { allowed_values }),
        }
    }
}

impl From<ValidationRule> for RawRule {
    fn from(rule: ValidationRule) -> Self {
        match rule {
            ValidationRule::Range {
                min_value,
                max_value,
            } => RawRule::Range {
                min_value,
                max_value,
            },
            ValidationRule::Enum { allowed_values } => RawRule::Enum { allowed_values },
        }
    }
}

impl ValidationRule {
    pub fn range(min_value: f64, max_value: f64) -> ValidationRule {
        ValidationRule::Range {
            min_value,
            max_value,
        }
    }

    /// Checks `value`, returning a description of the violated bound on failure.
    pub fn check<T: ParameterType>(&self, value: &T) -> Result<(), String> {
        match self {
            ValidationRule::Range {
                min_value,
                max_value,
            } => {
                let number = value
                    .as_number()
                    .ok_or_else(|| "expected a numeric value".to_string())?;

                // NaN is outside every range
                if (*min_value..=*max_value).contains(&number) {
                    Ok(())
                } else {
                    Err(format!("outside the range [{}, {}]", min_value, max_value))
                }
            }
            ValidationRule::Enum { allowed_values } => {
                let text = value
                    .as_text()
                    .ok_or_else(|| "expected a textual value".to_string())?;

                if allowed_values.iter().any(|allowed| allowed == text) {
                    Ok(())
                } else {
                    Err(format!("expected one of {}", allowed_values.join(", ")))
                }
            }
        }
    }

    /// Pulls an out-of-range numeric value back onto the nearest bound.
    /// Returns `None` when the rule or the value cannot be clamped.
    pub fn clamp<T: ParameterType>(&self, value: &T) -> Option<T> {
        match self {
            ValidationRule::Range {
                min_value,
                max_value,
            } => {
                let number = value.as_number()?;

                if number.is_nan() || min_value.is_nan() || max_value.is_nan() || min_value > max_value {
                    return None;
                }

                T::clamp_number(number, *min_value, *max_value)
            }
            ValidationRule::Enum { .. } => None,
        }
    }
}

/// Policy for a variable override that violates its rule.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValidationMode {
    /// Reject the override with [`crate::Error::InvalidParameterValue`]
    #[default]
    Error,
    /// Log a warning and keep the declared default
    Warn,
    /// Clamp numeric values into range, otherwise behave like `Warn`
    Clamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_accepts_bounds() {
        let rule = ValidationRule::range(0.0, 1.0);

        assert!(rule.check(&0.0).is_ok());
        assert!(rule.check(&1.0).is_ok());
        assert!(rule.check(&0.5).is_ok());
    }

    #[test]
    fn range_rejects_just_outside() {
        let rule = ValidationRule::range(0.0, 1.0);

        assert!(rule.check(&-1e-9).is_err());
        assert!(rule.check(&(1.0 + 1e-9)).is_err());
        assert!(rule.check(&f64::NAN).is_err());
    }

    #[test]
    fn range_rejects_wrong_kind() {
        let rule = ValidationRule::range(0.0, 1.0);

        let reason = rule.check(&"high".to_string()).unwrap_err();
        assert!(reason.contains("numeric"));
    }

    #[test]
    fn integer_values_use_numeric_view() {
        let rule = ValidationRule::range(1.0, 100.0);

        assert!(rule.check(&40i64).is_ok());
        assert!(rule.check(&0i64).is_err());
    }

    #[test]
    fn enum_rule_matches_text() {
        let rule = ValidationRule::Enum {
            allowed_values: vec!["low".to_string(), "high".to_string()],
        };

        assert!(rule.check(&"low".to_string()).is_ok());
        assert!(rule.check(&"medium".to_string()).is_err());
        assert!(rule.check(&3i64).is_err());
    }

    #[test]
    fn clamp_moves_onto_bound() {
        let rule = ValidationRule::range(0.0, 2.0);

        assert_eq!(rule.clamp(&3.5), Some(2.0));
        assert_eq!(rule.clamp(&-1i64), Some(0i64));
        assert_eq!(rule.clamp(&f64::NAN), None);
    }

    #[test]
    fn clamp_gives_up_on_inverted_range() {
        assert_eq!(ValidationRule::range(1.0, 0.0).clamp(&0.5), None);
        assert_eq!(ValidationRule::range(f64::NAN, 1.0).clamp(&0.5), None);
        assert_eq!(ValidationRule::range(0.0, 1.0).clamp(&f64::INFINITY), Some(1.0));
    }

    #[test]
    fn clamped_integers_stay_inside_fractional_bounds() {
        let rule = ValidationRule::range(0.5, 1.5);

        assert_eq!(rule.clamp(&3i64), Some(1i64));
        assert_eq!(rule.clamp(&-3i64), Some(1i64));
        assert_eq!(ValidationRule::range(0.2, 0.8).clamp(&3i64), None);
    }

    #[test]
    fn inverted_range_is_rejected_when_parsed() {
        let err = serde_yml::from_str::<ValidationRule>(
            "type: range\nmin_value: 1.0\nmax_value: 0.0\n",
        )
        .unwrap_err();

        assert!(err.to_string().contains("invalid range"));
    }

    #[test]
    fn rule_deserializes_from_tagged_map() {
        let rule: ValidationRule =
            serde_yml::from_str("type: range\nmin_value: 0.0\nmax_value: 2.0\n").unwrap();

        assert_eq!(rule, ValidationRule::range(0.0, 2.0));
    }
}
