//! Configuration for the services.
//!
//! `Settings` carries the shared service configuration (with its hard-coded
//! credentials), `DatabaseSettings` controls store bootstrap, and
//! `UpstreamSettings` tells the gateway and orders service where the other
//! services live.

mod database;

pub use database::{is_truthy, DatabaseSettings, DEFAULT_SCHEMA_FILE, DEFAULT_SEED_FILE};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::Result;

/// Hard-coded database password
pub const DEFAULT_DB_PASSWORD: &str = "admin123";

/// Hard-coded API key accepted by the gateway
pub const API_KEY: &str = "sk-1234567890abcdef";

/// Hard-coded token signing secret
pub const JWT_SECRET: &str = "my-secret-key";

/// The four deployable services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Service {
    Users,
    Products,
    Orders,
    Gateway,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Users => "users-service",
            Self::Products => "products-service",
            Self::Orders => "orders-service",
            Self::Gateway => "api-gateway",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Gateway => 8080,
            Self::Users => 8081,
            Self::Products => 8082,
            Self::Orders => 8083,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_host: String,
    pub database_port: u16,
    pub database_user: String,
    pub database_password: String,
    pub server_port: u16,
    pub log_level: String,
    pub api_key: String,
    pub jwt_secret: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_host: "localhost".into(),
            database_port: 5432,
            database_user: "admin".into(),
            database_password: DEFAULT_DB_PASSWORD.into(),
            server_port: 8080,
            log_level: "info".into(),
            api_key: API_KEY.into(),
            jwt_secret: JWT_SECRET.into(),
        }
    }
}

impl Settings {
    /// Load settings, overlaying an optional JSON file on the defaults.
    ///
    /// Never fails: an unreadable or malformed file yields the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let defaults = Self::default();
        let Some(path) = path else {
            return defaults;
        };

        let loaded = Config::try_from(&defaults)
            .and_then(|base| {
                Config::builder()
                    .add_source(base)
                    .add_source(File::from(path).format(FileFormat::Json).required(false))
                    .build()
            })
            .and_then(|config| config.try_deserialize::<Settings>());

        match loaded {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                defaults
            }
        }
    }

    /// Connection string with the password in plain text
    pub fn connection_string(&self) -> String {
        format!(
            "{}:{}@{}",
            self.database_user, self.database_password, self.database_host
        )
    }
}

/// Base URLs of the services the gateway and orders service call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamSettings {
    pub users_service_url: String,
    pub products_service_url: String,
    pub orders_service_url: String,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            users_service_url: "http://localhost:8081".into(),
            products_service_url: "http://localhost:8082".into(),
            orders_service_url: "http://localhost:8083".into(),
        }
    }
}

impl UpstreamSettings {
    /// Read `USERS_SERVICE_URL`, `PRODUCTS_SERVICE_URL` and `ORDERS_SERVICE_URL`
    pub fn from_env() -> Result<Self> {
        Self::from_source(None)
    }

    pub fn from_source(vars: Option<config::Map<String, String>>) -> Result<Self> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("users_service_url", defaults.users_service_url)?
            .set_default("products_service_url", defaults.products_service_url)?
            .set_default("orders_service_url", defaults.orders_service_url)?
            .add_source(Environment::default().ignore_empty(true).source(vars))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let settings = Settings::load(None);
        assert_eq!(settings.database_password, DEFAULT_DB_PASSWORD);
        assert_eq!(settings.api_key, API_KEY);
        assert_eq!(settings.jwt_secret, JWT_SECRET);
    }

    #[test]
    fn test_load_from_file_overlays_defaults() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"database_host": "testhost", "database_port": 3306, "server_port": 9090}}"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path()));
        assert_eq!(settings.database_host, "testhost");
        assert_eq!(settings.database_port, 3306);
        assert_eq!(settings.server_port, 9090);
        assert_eq!(settings.database_password, DEFAULT_DB_PASSWORD);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let settings = Settings::load(Some(Path::new("/definitely/not/here.json")));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_malformed_file_returns_defaults() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{ not json").unwrap();

        let settings = Settings::load(Some(file.path()));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_connection_string() {
        let settings = Settings {
            database_host: "localhost".into(),
            database_user: "user".into(),
            database_password: "pass".into(),
            ..Settings::default()
        };
        assert_eq!(settings.connection_string(), "user:pass@localhost");
    }

    #[test]
    fn test_upstreams_from_source() {
        let vars: config::Map<String, String> = [(
            "USERS_SERVICE_URL".to_string(),
            "http://users:9000".to_string(),
        )]
        .into_iter()
        .collect();

        let upstreams = UpstreamSettings::from_source(Some(vars)).unwrap();
        assert_eq!(upstreams.users_service_url, "http://users:9000");
        assert_eq!(upstreams.products_service_url, "http://localhost:8082");
    }

    #[test]
    fn test_service_ports() {
        assert_eq!(Service::Gateway.default_port(), 8080);
        assert_eq!(Service::Users.default_port(), 8081);
        assert_eq!(Service::Products.default_port(), 8082);
        assert_eq!(Service::Orders.default_port(), 8083);
        assert_eq!(Service::Orders.to_string(), "orders-service");
    }
}
