//! Configuration module for airtable-roulette
//!
//! Supports configuration via file and environment variables. The resulting
//! [`AppConfig`] is built once at startup and handed to the server; handlers
//! never read the process environment themselves.

use crate::error::ServiceError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Environment variable holding the listening port
pub const ENV_PORT: &str = "PORT";
/// Environment variable holding the Airtable personal access token
pub const ENV_TOKEN: &str = "AIRTABLE_TOKEN";
/// Environment variable holding the Airtable base identifier
pub const ENV_BASE_ID: &str = "AIRTABLE_BASE_ID";
/// Environment variable holding the target table name
pub const ENV_TABLE_NAME: &str = "TABLE_NAME";
/// Environment variable overriding the Airtable API root
pub const ENV_API_URL: &str = "AIRTABLE_API_URL";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind the server to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Airtable connection settings
///
/// Token and base id are optional here on purpose: their absence is reported
/// per request by [`AirtableConfig::table`], not at startup.
#[derive(Clone, Serialize, Deserialize)]
pub struct AirtableConfig {
    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
    /// Base identifier (`app...`)
    #[serde(default)]
    pub base_id: Option<String>,
    /// Table the service operates on
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Root of the REST API, without trailing base or table segments
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_table_name() -> String {
    "responses".to_string()
}

fn default_api_url() -> String {
    "https://api.airtable.com/v0".to_string()
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_id: None,
            table_name: default_table_name(),
            api_url: default_api_url(),
        }
    }
}

impl std::fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("base_id", &self.base_id)
            .field("table_name", &self.table_name)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// A fully specified table target: credentials plus location.
#[derive(Clone, PartialEq, Eq)]
pub struct Table {
    pub token: String,
    pub base_id: String,
    pub name: String,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("base_id", &self.base_id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AirtableConfig {
    /// Resolve the table target, failing on the first missing credential.
    ///
    /// The token is checked before the base id so the error always names the
    /// first variable an operator has to set.
    pub fn table(&self) -> Result<Table, ServiceError> {
        let token = present(&self.token).ok_or(ServiceError::MissingConfig(ENV_TOKEN))?;
        let base_id = present(&self.base_id).ok_or(ServiceError::MissingConfig(ENV_BASE_ID))?;

        Ok(Table {
            token: token.to_string(),
            base_id: base_id.to_string(),
            name: self.table_name.clone(),
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Airtable configuration
    #[serde(default)]
    pub airtable: AirtableConfig,
}

impl AppConfig {
    /// Load configuration from `.env`, an optional file and the process environment
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        // Try to load .env file (ignore if not found)
        let _ = dotenvy::dotenv();

        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(Some(path.as_ref()), &env)
    }

    /// Build configuration from defaults, an optional TOML file and a set of
    /// environment variables.
    pub fn from_sources(
        path: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        // Add default config
        builder = builder.add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            let name = path
                .to_str()
                .with_context(|| format!("config path {} is not valid UTF-8", path.display()))?;
            builder =
                builder.add_source(config::File::new(name, config::FileFormat::Toml).required(false));
        }

        let lookup = |key: &str| {
            env.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = lookup(ENV_PORT)
            .map(|raw| {
                raw.parse::<u16>()
                    .with_context(|| format!("{ENV_PORT} must be a valid port number, got {raw:?}"))
            })
            .transpose()?;

        builder = builder
            .set_override_option("server.port", port.map(i64::from))?
            .set_override_option("airtable.token", lookup(ENV_TOKEN))?
            .set_override_option("airtable.base_id", lookup(ENV_BASE_ID))?
            .set_override_option("airtable.table_name", lookup(ENV_TABLE_NAME))?
            .set_override_option("airtable.api_url", lookup(ENV_API_URL))?;

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config)
    }

    /// Copy of the configuration that is safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.airtable.token.is_some() {
            copy.airtable.token = Some("<redacted>".to_string());
        }
        copy
    }
}

/// Read-only configuration handle shared across request handlers
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<AppConfig>,
}

impl SharedConfig {
    /// Create a new shared configuration
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(config),
        }
    }

    /// Borrow the configuration
    pub fn get(&self) -> &AppConfig {
        &self.inner
    }
}
