//! Store bootstrap settings resolved from `DB_*` environment variables.

use config::{Config, Environment};
use serde::Deserialize;
use std::path::PathBuf;

use super::Service;
use crate::Result;

/// Default location of the schema file, relative to the working directory
pub const DEFAULT_SCHEMA_FILE: &str = "sql/schema.sql";

/// Default location of the seed file, relative to the working directory
pub const DEFAULT_SEED_FILE: &str = "sql/seed.sql";

/// Environment prefix for store settings (`DB_SCHEMA_FILE`, `DB_AUTO_SEED`, `DB_SEED_FILE`)
const ENV_PREFIX: &str = "DB";

/// Where the store reads its schema and seed data from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseSettings {
    /// Schema DDL file; the embedded schema is used when it cannot be read
    pub schema_file: PathBuf,
    /// Raw auto-seed toggle as read from the environment
    #[serde(default)]
    pub auto_seed: String,
    /// Seed DML file executed when auto-seed is enabled
    pub seed_file: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            schema_file: PathBuf::from(DEFAULT_SCHEMA_FILE),
            auto_seed: String::new(),
            seed_file: PathBuf::from(DEFAULT_SEED_FILE),
        }
    }
}

impl DatabaseSettings {
    /// Load from the process environment with generic defaults (auto-seed off)
    pub fn from_env() -> Result<Self> {
        Self::from_source(&[], None)
    }

    /// Load from the process environment layered over a service's defaults.
    ///
    /// The users and products services seed themselves unless told otherwise.
    pub fn for_service(service: Service) -> Result<Self> {
        Self::from_source(service_defaults(service), None)
    }

    /// Load from an explicit variable map instead of the process environment.
    ///
    /// `defaults` are `(key, value)` pairs using the unprefixed lowercase keys
    /// (`schema_file`, `auto_seed`, `seed_file`). `vars` holds raw variable
    /// names such as `DB_AUTO_SEED`; `None` reads the real environment.
    pub fn from_source(
        defaults: &[(&str, &str)],
        vars: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("schema_file", DEFAULT_SCHEMA_FILE)?
            .set_default("auto_seed", "")?
            .set_default("seed_file", DEFAULT_SEED_FILE)?;

        for (key, value) in defaults {
            builder = builder.set_default(*key, *value)?;
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .ignore_empty(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Whether the seed file should be executed on open
    pub fn auto_seed_enabled(&self) -> bool {
        is_truthy(&self.auto_seed)
    }

    pub fn with_schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_file = path.into();
        self
    }

    pub fn with_seed_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_file = path.into();
        self
    }

    pub fn with_auto_seed(mut self, flag: impl Into<String>) -> Self {
        self.auto_seed = flag.into();
        self
    }
}

/// `"1"` or any casing of `"true"`; everything else is off
pub fn is_truthy(flag: &str) -> bool {
    flag == "1" || flag.eq_ignore_ascii_case("true")
}

fn service_defaults(service: Service) -> &'static [(&'static str, &'static str)] {
    match service {
        Service::Users => &[("auto_seed", "1"), ("seed_file", "sql/seeds/users.sql")],
        Service::Products => &[("auto_seed", "1"), ("seed_file", "sql/seeds/products.sql")],
        Service::Orders | Service::Gateway => &[],
    }
}
