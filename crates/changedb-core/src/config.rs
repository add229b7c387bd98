use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    extract::ExtractOptions,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid summary config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Config, err.to_string())
    }
}

///
/// IndexBackend
///
/// Storage chosen for the instance and value indices.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    #[default]
    Transient,
    Durable,
}

///
/// SummaryConfig
///
/// Knobs for building a change summary. Every field may be omitted.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryConfig {
    /// Run the relationship pass.
    pub include_relationships: bool,

    /// Fail when the other end of a foreign-key relationship cannot be
    /// attributed to a class; otherwise skip that relationship.
    pub strict_endpoints: bool,

    /// Fail when an updated row no longer exists in live storage.
    pub require_live_rows: bool,

    pub backend: IndexBackend,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            include_relationships: true,
            strict_endpoints: true,
            require_live_rows: true,
            backend: IndexBackend::Transient,
        }
    }
}

impl SummaryConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    #[must_use]
    pub const fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            include_relationships: self.include_relationships,
            strict_endpoints: self.strict_endpoints,
            require_live_rows: self.require_live_rows,
        }
    }
}
