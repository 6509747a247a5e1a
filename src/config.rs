//! Application configuration

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;
use url::Url;

use crate::criteria::SearchStrategy;
use crate::errors::ConsoleError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub search: SearchConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Root of the REST collaborator, `/vessels` is resolved against it
    pub base_url: String,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub request_timeout: Duration,
}

/// Which of the two search designs is active
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategyKind {
    FuzzyRangeOr,
    FlatEquality,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub strategy: SearchStrategyKind,
    /// Full span of numeric range clauses, centered on the input value
    pub range_width: f64,
    /// Minimum name length accepted by the flat equality search
    pub min_name_length: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        #[cfg(feature = "dotenv")]
        dotenvy::dotenv().ok();

        Self::builder(File::with_name("config/default").required(false))?
            .build()?
            .try_deserialize()
    }

    /// Load from an explicit file, environment variables still take precedence
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::builder(File::from(path))?.build()?.try_deserialize()
    }

    fn builder(
        file: File<config::FileSourceFile, config::FileFormat>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("backend.base_url", "http://localhost:3000")?
            .set_default("backend.request_timeout", 30)?
            .set_default("search.strategy", "fuzzy_range_or")?
            .set_default("search.range_width", 2.0)?
            .set_default("search.min_name_length", 3)?
            .add_source(file)
            .add_source(
                Environment::with_prefix("VESSELCONSOLE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            ))
    }

    pub fn validate(&self) -> Result<(), ConsoleError> {
        self.backend.validate()?;
        self.search.validate()?;
        Ok(())
    }
}

impl BackendConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConsoleError> {
        self.base_url()?;
        if self.request_timeout.is_zero() {
            return Err(ConsoleError::InvalidConfiguration {
                message: "Request timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Parsed base URL, restricted to http(s)
    pub fn base_url(&self) -> Result<Url, ConsoleError> {
        let url = Url::parse(&self.base_url)?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConsoleError::InvalidConfiguration {
                message: format!("Unsupported backend scheme: {}", other),
            }),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConsoleError> {
        if !(self.range_width > 0.0) {
            return Err(ConsoleError::InvalidConfiguration {
                message: "Range width must be greater than zero".to_string(),
            });
        }
        if self.min_name_length == 0 {
            return Err(ConsoleError::InvalidConfiguration {
                message: "Minimum name length must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Build the configured search strategy
    pub fn strategy(&self) -> SearchStrategy {
        match self.strategy {
            SearchStrategyKind::FuzzyRangeOr => SearchStrategy::FuzzyRangeOr {
                range_width: self.range_width,
            },
            SearchStrategyKind::FlatEquality => SearchStrategy::FlatEquality {
                min_name_length: self.min_name_length,
            },
        }
    }
}
