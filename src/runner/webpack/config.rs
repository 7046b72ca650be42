//! Lookup configuration.
//!
//! Expected format:
//! ```toml
//! [lookup]
//! mode = "strict"            # or "lenient"
//! max_attempts = 5
//! record_search_history = true
//! ```
//! Every key is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::runner::lazy::factory::DEFAULT_MAX_ATTEMPTS;
use crate::runner::webpack::error::WebpackError;

/// What happens when a lookup finds nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    /// Raise, so integration problems surface immediately.
    Strict,
    /// Log a warning and return nothing.
    Lenient,
}
impl Default for LookupMode {
    fn default() -> Self {
        LookupMode::Lenient
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebpackConfig {
    pub mode: LookupMode,
    pub max_attempts: u32,
    pub record_search_history: bool,
}
impl Default for WebpackConfig {
    fn default() -> Self {
        WebpackConfig {
            mode: LookupMode::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            record_search_history: true,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct ConfigFile {
    #[serde(default)]
    lookup: WebpackConfig,
}

impl WebpackConfig {
    pub fn strict() -> Self {
        WebpackConfig {
            mode: LookupMode::Strict,
            ..WebpackConfig::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, WebpackError> {
        let content = fs::read_to_string(path).map_err(|error| WebpackError::Io {
            path: path.display().to_string(),
            error,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, WebpackError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| WebpackError::Config(e.to_string()))?;
        if file.lookup.max_attempts == 0 {
            return Err(WebpackError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(file.lookup)
    }

    pub fn to_toml(&self) -> Result<String, WebpackError> {
        toml::to_string(&ConfigFile {
            lookup: self.clone(),
        })
        .map_err(|e| WebpackError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_empty_config() {
        assert_eq!(WebpackConfig::parse("").unwrap(), WebpackConfig::default());
    }

    #[test]
    fn test_parse_lookup_section() {
        let config = WebpackConfig::parse(
            r#"
            [lookup]
            mode = "strict"
            max_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            WebpackConfig {
                mode: LookupMode::Strict,
                max_attempts: 3,
                record_search_history: true,
            }
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            WebpackConfig::parse("[lookup]\nmode = \"loud\""),
            Err(WebpackError::Config(_))
        ));
        assert!(matches!(
            WebpackConfig::parse("[lookup]\nmax_attempts = 0"),
            Err(WebpackError::Config(_))
        ));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = WebpackConfig::strict();
        let text = config.to_toml().unwrap();
        assert_eq!(WebpackConfig::parse(&text).unwrap(), config);
    }
}
