//! Store configuration read from the environment.

use core::fmt;
use core::str::FromStr;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

pub const ENV_STORE: &str = "SUPERMARKET_STORE";
pub const ENV_MONGO_URI: &str = "SUPERMARKET_MONGO_URI";
pub const ENV_DATABASE: &str = "SUPERMARKET_DATABASE";
pub const ENV_APP_NAME: &str = "SUPERMARKET_APP_NAME";
pub const ENV_FIXTURE: &str = "SUPERMARKET_FIXTURE";

pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017/";
pub const DEFAULT_DATABASE: &str = "supermarket";
pub const DEFAULT_APP_NAME: &str = "supermarket-reports";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: `{value}`")]
    InvalidValue { var: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("unsupported connection string scheme: `{0}`")]
    InvalidScheme(String),
}

/// Which [`DocumentStore`](crate::DocumentStore) backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    MongoDb,
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::MongoDb => "mongodb",
            StoreKind::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StoreKind::MongoDb),
            "memory" | "in-memory" => Ok(StoreKind::Memory),
            _ => Err(ConfigError::InvalidValue {
                var: ENV_STORE,
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub mongo_uri: String,
    pub database: String,
    /// Reported to the server as the driver's application name.
    pub app_name: String,
    /// JSON fixture imported into the in-memory store on open.
    pub fixture: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            mongo_uri: DEFAULT_MONGO_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            fixture: None,
        }
    }
}

impl StoreConfig {
    /// Read `SUPERMARKET_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let kind = match lookup(ENV_STORE) {
            Some(raw) => raw.parse()?,
            None => {
                info!(var = ENV_STORE, default = %defaults.kind, "variable unset, using default");
                defaults.kind
            }
        };
        let config = Self {
            kind,
            mongo_uri: or_default(&lookup, ENV_MONGO_URI, defaults.mongo_uri),
            database: or_default(&lookup, ENV_DATABASE, defaults.database),
            app_name: or_default(&lookup, ENV_APP_NAME, defaults.app_name),
            fixture: lookup(ENV_FIXTURE)
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::Empty(ENV_DATABASE));
        }
        if self.kind == StoreKind::MongoDb {
            let uri = self.mongo_uri.trim();
            if uri.is_empty() {
                return Err(ConfigError::Empty(ENV_MONGO_URI));
            }
            if !(uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://")) {
                return Err(ConfigError::InvalidScheme(uri.to_string()));
            }
        }
        Ok(())
    }
}

fn or_default(lookup: &impl Fn(&str) -> Option<String>, var: &'static str, default: String) -> String {
    lookup(var).unwrap_or_else(|| {
        info!(var, default = %default, "variable unset, using default");
        default
    })
}
