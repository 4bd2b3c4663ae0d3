use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = "vibecoder.toml";
pub const DB_FILE_NAME: &str = "vibecoder.db";
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;
pub const DEFAULT_AUTOSAVE_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Shared secret students need to self-register.
    pub invite_code: String,
    pub session_ttl_days: i64,
    /// Autosave delay handed to editing clients.
    pub autosave_secs: u64,
}

/// On-disk settings stored next to the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    pub invite_code: String,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
    #[serde(default = "default_autosave_secs")]
    pub autosave_secs: u64,
}

fn default_session_ttl_days() -> i64 {
    DEFAULT_SESSION_TTL_DAYS
}

fn default_autosave_secs() -> u64 {
    DEFAULT_AUTOSAVE_SECS
}

impl FileConfig {
    #[must_use]
    pub fn new(invite_code: impl Into<String>) -> Self {
        Self {
            invite_code: invite_code.into(),
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            autosave_secs: DEFAULT_AUTOSAVE_SECS,
        }
    }

    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&path)?;
        let config: FileConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        self.validate()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(data_dir.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.invite_code.trim().is_empty() {
            return Err(Error::Config("invite_code cannot be empty".to_string()));
        }
        if self.session_ttl_days < 1 {
            return Err(Error::Config("session_ttl_days must be at least 1".to_string()));
        }
        if self.autosave_secs == 0 {
            return Err(Error::Config("autosave_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl ServerConfig {
    /// Builds the server settings from the data directory's config file.
    pub fn from_data_dir(host: String, port: u16, data_dir: PathBuf) -> Result<Self> {
        let file = FileConfig::load(&data_dir)?;
        Ok(Self {
            host,
            port,
            data_dir,
            invite_code: file.invite_code,
            session_ttl_days: file.session_ttl_days,
            autosave_secs: file.autosave_secs,
        })
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            invite_code: String::new(),
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            autosave_secs: DEFAULT_AUTOSAVE_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_config_roundtrip_through_disk() {
        let temp = TempDir::new().unwrap();
        let config = FileConfig::new("class-2026");
        config.save(temp.path()).unwrap();

        let loaded = FileConfig::load(temp.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_server_config_reads_file_settings() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "invite_code = \"abc\"\nsession_ttl_days = 3\nautosave_secs = 4\n",
        )
        .unwrap();

        let config =
            ServerConfig::from_data_dir("127.0.0.1".to_string(), 9000, temp.path().to_path_buf())
                .unwrap();
        assert_eq!(config.invite_code, "abc");
        assert_eq!(config.session_ttl_days, 3);
        assert_eq!(config.autosave_secs, 4);
    }

    #[test]
    fn test_file_config_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "invite_code = \"abc\"\n").unwrap();

        let loaded = FileConfig::load(temp.path()).unwrap();
        assert_eq!(loaded.session_ttl_days, 7);
        assert_eq!(loaded.autosave_secs, 10);
    }

    #[test]
    fn test_empty_invite_code_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "invite_code = \"  \"\n").unwrap();

        assert!(matches!(
            FileConfig::load(temp.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_db_path() {
        let config = ServerConfig {
            data_dir: PathBuf::from("/srv/vibe"),
            ..Default::default()
        };
        assert_eq!(config.db_path(), PathBuf::from("/srv/vibe/vibecoder.db"));
        assert!(config.socket_addr().is_ok());
    }
}
