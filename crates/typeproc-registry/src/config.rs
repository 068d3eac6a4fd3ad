//! # Registry Configuration
//!
//! [`RegistryConfig`] selects whether the built-in container entries are
//! installed and which union strategy `convert` uses when the caller does
//! not name one. It loads from YAML; the shared registry also reads the
//! strategy from the environment.
//!
//! ```yaml
//! builtins: true
//! union_strategy: first_in_union
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable read by [`RegistryConfig::from_env`].
pub const UNION_STRATEGY_ENV: &str = "TYPEPROC_UNION_STRATEGY";

/// How a union converter picks the variant to convert to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnionStrategy {
    /// Rank variants by how well the value already matches them (FULL, then
    /// PARTIAL, then NONE, each in declaration order) and take the first
    /// converter that succeeds.
    #[default]
    BestMatch,
    /// Only ever convert to the first variant.
    FirstInUnion,
}

impl UnionStrategy {
    /// The `snake_case` name used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BestMatch => "best_match",
            Self::FirstInUnion => "first_in_union",
        }
    }
}

impl fmt::Display for UnionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnionStrategy {
    type Err = ConfigError;

    /// Accepts the `snake_case` names, also with dashes and in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_match" => Ok(Self::BestMatch),
            "first_in_union" => Ok(Self::FirstInUnion),
            _ => Err(ConfigError::UnknownStrategy {
                value: s.to_string(),
            }),
        }
    }
}

/// Errors loading a [`RegistryConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The YAML document is malformed or has unknown fields.
    #[error("invalid registry configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The union strategy name is not recognized.
    #[error("unknown union strategy '{value}' (expected 'best_match' or 'first_in_union')")]
    UnknownStrategy {
        /// The rejected name.
        value: String,
    },
}

/// Registry construction options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Install the built-in `tuple`, `list`, `set` and `dict` entries.
    pub builtins: bool,
    /// Strategy used by `convert` when none is passed explicitly.
    pub union_strategy: UnionStrategy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            builtins: true,
            union_strategy: UnionStrategy::BestMatch,
        }
    }
}

impl RegistryConfig {
    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Defaults, with the union strategy taken from
    /// [`UNION_STRATEGY_ENV`] when it is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::default();
        match std::env::var(UNION_STRATEGY_ENV) {
            Ok(value) => Ok(config.with_union_strategy(value.parse()?)),
            Err(std::env::VarError::NotPresent) => Ok(config),
            Err(std::env::VarError::NotUnicode(raw)) => Err(ConfigError::UnknownStrategy {
                value: raw.to_string_lossy().into_owned(),
            }),
        }
    }

    /// Builder-style strategy override.
    pub fn with_union_strategy(mut self, strategy: UnionStrategy) -> Self {
        self.union_strategy = strategy;
        self
    }

    /// Builder-style toggle for the built-in container entries.
    pub fn with_builtins(mut self, builtins: bool) -> Self {
        self.builtins = builtins;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RegistryConfig::default();
        assert!(config.builtins);
        assert_eq!(config.union_strategy, UnionStrategy::BestMatch);
    }

    #[test]
    fn yaml_with_missing_fields_uses_defaults() {
        let config = RegistryConfig::from_yaml_str("union_strategy: first_in_union\n").unwrap();
        assert!(config.builtins);
        assert_eq!(config.union_strategy, UnionStrategy::FirstInUnion);
    }

    #[test]
    fn yaml_rejects_unknown_fields() {
        let err = RegistryConfig::from_yaml_str("builtins: true\ncache: false\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn yaml_rejects_unknown_strategy() {
        assert!(RegistryConfig::from_yaml_str("union_strategy: random\n").is_err());
    }

    #[test]
    fn strategy_names_parse_leniently() {
        assert_eq!("best_match".parse::<UnionStrategy>().unwrap(), UnionStrategy::BestMatch);
        assert_eq!(
            " First-In-Union ".parse::<UnionStrategy>().unwrap(),
            UnionStrategy::FirstInUnion
        );
        assert!(matches!(
            "sometimes".parse::<UnionStrategy>(),
            Err(ConfigError::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn strategy_display_round_trips() {
        for strategy in [UnionStrategy::BestMatch, UnionStrategy::FirstInUnion] {
            assert_eq!(strategy.to_string().parse::<UnionStrategy>().unwrap(), strategy);
        }
    }
}
