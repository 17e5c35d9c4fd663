use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tempsweep.toml";

/// Prefix for environment overrides, e.g. `TEMPSWEEP__DATABASE__DSN`.
pub const ENV_PREFIX: &str = "TEMPSWEEP__";

/// Catalog dialect spoken by the target cluster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Coordinator plus segments; session ids come from `pg_stat_activity.sess_id`.
    #[default]
    Greenplum,
    /// Single-node PostgreSQL 16+; session ids are backend ids.
    Postgres,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Flavor::Greenplum => "greenplum",
            Flavor::Postgres => "postgres",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string for the coordinator
    pub dsn: String,
    /// Catalog dialect of the target cluster
    pub flavor: Flavor,
    /// Maximum time to wait for a connection to be established
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dsn: String::from("postgres://gpadmin@localhost:5432/postgres"),
            flavor: Flavor::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Databases to sweep. Empty means the database named in the DSN.
    pub databases: Vec<String>,
    /// Sweep every database that accepts connections
    pub all_databases: bool,
    /// Directory where repair scripts are written
    pub repair_dir: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            databases: Vec::new(),
            all_databases: false,
            repair_dir: ".data/repair".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Connection to the coordinator
    pub database: DatabaseConfig,
    /// Which databases to sweep and where to put repair output
    pub sweep: SweepConfig,
}

impl Configuration {
    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
    }

    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config = Self::figment()
            .merge(Toml::file(DEFAULT_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }

    /// Load configuration from an explicit file; environment overrides still apply.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        let config = Self::figment()
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }
}
