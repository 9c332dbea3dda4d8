//! Daemon configuration (TOML).
//!
//! Every field is optional in the file; zero values fall back to the
//! documented defaults after parsing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use iarnet_persist::PoolSettings;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_RPC_PORT: u16 = 50010;
const DEFAULT_MAX_OPEN_CONNS: u32 = 10;
const DEFAULT_MAX_IDLE_CONNS: u32 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory for all persistent state.
    #[serde(default)]
    pub data_dir: String,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the domain database; defaults to `<data_dir>/domains.db`.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub max_open_conns: u32,
    #[serde(default)]
    pub max_idle_conns: u32,
    /// 0 disables connection aging.
    #[serde(default)]
    pub conn_max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Port the heartbeat intake and scheduling services listen on.
    #[serde(default)]
    pub port: u16,
}

impl Config {
    /// Load from a TOML file and apply defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_defaults();
        Ok(config)
    }

    pub fn apply_defaults(&mut self) {
        if self.data_dir.is_empty() {
            self.data_dir = DEFAULT_DATA_DIR.to_string();
        }
        if self.database.path.is_empty() {
            self.database.path = format!("{}/domains.db", self.data_dir);
        }
        if self.database.max_open_conns == 0 {
            self.database.max_open_conns = DEFAULT_MAX_OPEN_CONNS;
        }
        if self.database.max_idle_conns == 0 {
            self.database.max_idle_conns = DEFAULT_MAX_IDLE_CONNS;
        }
        if self.http.port == 0 {
            self.http.port = DEFAULT_HTTP_PORT;
        }
        if self.rpc.port == 0 {
            self.rpc.port = DEFAULT_RPC_PORT;
        }
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database.path)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_open: self.database.max_open_conns,
            max_idle: self.database.max_idle_conns,
            max_lifetime_secs: self.database.conn_max_lifetime_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_fill_zero_values() {
        let mut config = Config::default();
        config.apply_defaults();

        assert_eq!(config.data_dir, "./data");
        assert_eq!(config.database.path, "./data/domains.db");
        assert_eq!(config.database.max_open_conns, 10);
        assert_eq!(config.database.max_idle_conns, 5);
        assert_eq!(config.database.conn_max_lifetime_secs, 0);
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.rpc.port, 50010);
    }

    #[test]
    fn file_values_win_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
data_dir = "/var/lib/iarnet"

[database]
max_open_conns = 32

[http]
port = 9090

[rpc]
port = 51000
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.data_dir, "/var/lib/iarnet");
        assert_eq!(config.database.path, "/var/lib/iarnet/domains.db");
        assert_eq!(config.database.max_open_conns, 32);
        assert_eq!(config.database.max_idle_conns, 5); // defaulted
        assert_eq!(config.http.port, 9090);
        assert_eq!(config.rpc.port, 51000);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.rpc.port, 50010);
    }
}
