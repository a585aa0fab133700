use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    /// Insert demo motos and anchors into empty tables on startup
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
}

fn default_seed_demo_data() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens
    pub key: String,
    pub issuer: String,
    pub audience: String,
    pub token_ttl_hours: i64,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            key: "DEV-KEY-CHANGE-ME".to_string(),
            issuer: "radarmottu".to_string(),
            audience: "radarmottu-clients".to_string(),
            token_ttl_hours: 8,
            username: "jp".to_string(),
            password: "123".to_string(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config = serde_json::from_str(&content)
            .with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    pub fn default_config() -> Self {
        Config {
            server: ServerConfig {
                bind_addr: "127.0.0.1:8080".to_string(),
            },
            database: DatabaseConfig {
                path: "./radar_mottu.db".to_string(),
                seed_demo_data: true,
            },
            auth: AuthConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_section_is_optional() {
        let json = r#"{
            "server": { "bind_addr": "0.0.0.0:9000" },
            "database": { "path": "/tmp/x.db" },
            "auth": {
                "key": "k", "issuer": "i", "audience": "a",
                "token_ttl_hours": 1, "username": "u", "password": "p"
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert!(config.database.seed_demo_data);
        assert_eq!(config.pagination.default_page_size, 10);
        assert_eq!(config.pagination.max_page_size, 100);
    }

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.auth.issuer, "radarmottu");
        assert_eq!(parsed.auth.token_ttl_hours, 8);
        assert!(parsed.database.seed_demo_data);
    }

    #[test]
    fn test_seeding_can_be_disabled() {
        let json = r#"{
            "server": { "bind_addr": "0.0.0.0:9000" },
            "database": { "path": "/tmp/x.db", "seed_demo_data": false },
            "auth": {
                "key": "k", "issuer": "i", "audience": "a",
                "token_ttl_hours": 1, "username": "u", "password": "p"
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(!config.database.seed_demo_data);
    }
}
