//! Configuration loading with Figment.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `./distribution.toml`
//! 3. the file named by `DISTRIBUTION_CONFIG`, if set
//! 4. `DISTRIBUTION_*` environment variables

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "distribution.toml";
pub const CONFIG_PATH_VAR: &str = "DISTRIBUTION_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    /// Tracing level for this crate (RUST_LOG wins when set)
    pub log_level: String,
    /// Where the terminal UI writes its log
    pub log_file: String,
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: "distribution.log".to_string(),
            store: StoreConfig::default(),
            cache: CacheConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Remote store connection
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_token: String,
    pub project_name: String,
    pub timeout_secs: u64,
    /// Rows per request when listing a table
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_token: String::new(),
            project_name: "ISKMP".to_string(),
            timeout_secs: 30,
            page_size: 100,
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("project_name", &self.project_name)
            .field("timeout_secs", &self.timeout_secs)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    pub base_id_ttl_secs: u64,
    /// Kept short: tables can be added during a session
    pub table_id_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_id_ttl_secs: 3600,
            table_id_ttl_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.store.api_token.trim().is_empty() {
            bail!("store.api_token is required (set DISTRIBUTION_STORE_API_TOKEN)");
        }
        if !(self.store.base_url.starts_with("http://") || self.store.base_url.starts_with("https://")) {
            bail!("store.base_url must be an http(s) URL, got '{}'", self.store.base_url);
        }
        if self.store.project_name.trim().is_empty() {
            bail!("store.project_name must not be empty");
        }
        if self.store.page_size == 0 {
            bail!("store.page_size must be at least 1");
        }
        if self.cache.base_id_ttl_secs == 0 || self.cache.table_id_ttl_secs == 0 {
            bail!("cache TTLs must be at least one second");
        }
        Ok(())
    }
}

/// Build the layered Figment (exposed so callers can inspect metadata)
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(CONFIG_FILE));

    if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
        figment = figment.merge(Toml::file(path));
    }

    figment.merge(env_provider())
}

pub fn load_config() -> Result<AppConfig, figment::Error> {
    build_figment().extract()
}

/// Defaults + the given TOML only (no files, no env)
pub fn load_config_from_str(toml_content: &str) -> Result<AppConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

pub fn load_and_validate() -> Result<AppConfig> {
    let config = load_config().context("Failed to load configuration")?;
    config.validate()?;
    Ok(config)
}

/// `DISTRIBUTION_STORE_API_TOKEN` -> `store.api_token`
///
/// Section prefixes are mapped explicitly since field names contain underscores.
/// Keys arrive from the environment in upper case.
fn env_provider() -> Env {
    Env::prefixed("DISTRIBUTION_").filter_map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        if key_str == "config" {
            return None;
        }
        Some(env_key_to_path(&key_str).into())
    })
}

const SECTIONS: [&str; 3] = ["store", "cache", "server"];

fn env_key_to_path(key: &str) -> String {
    for section in SECTIONS {
        if let Some(field) = key.strip_prefix(section).and_then(|rest| rest.strip_prefix('_')) {
            return format!("{section}.{field}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store.project_name, "ISKMP");
        assert_eq!(config.cache.base_id_ttl_secs, 3600);
        assert_eq!(config.cache.table_id_ttl_secs, 60);
        assert!(config.validate().is_err(), "no token by default");
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
log_level = "debug"

[store]
base_url = "https://db.example.org"
api_token = "tok"
page_size = 25

[cache]
table_id_ttl_secs = 30
"#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.store.base_url, "https://db.example.org");
        assert_eq!(config.store.page_size, 25);
        assert_eq!(config.store.project_name, "ISKMP");
        assert_eq!(config.cache.table_id_ttl_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = load_config_from_str("[store]\napi_tokn = \"typo\"\n");
        assert!(result.is_err(), "typo should not be accepted silently");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.store.api_token = "tok".to_string();
        assert!(config.validate().is_ok());

        config.store.base_url = "db.example.org".to_string();
        assert!(config.validate().is_err());

        config.store.base_url = "https://db.example.org".to_string();
        config.store.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_token_not_in_debug_output() {
        let mut config = AppConfig::default();
        config.store.api_token = "secret-token".to_string();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "[store]\nproject_name = \"FromFile\"\n")?;
            jail.set_env("DISTRIBUTION_STORE_API_TOKEN", "env-token");
            jail.set_env("DISTRIBUTION_CACHE_BASE_ID_TTL_SECS", "120");

            let config = load_config()?;
            assert_eq!(config.store.api_token, "env-token");
            assert_eq!(config.store.project_name, "FromFile");
            assert_eq!(config.cache.base_id_ttl_secs, 120);
            Ok(())
        });
    }

    #[test]
    fn test_env_token_passes_validation() {
        Jail::expect_with(|jail| {
            jail.set_env("DISTRIBUTION_STORE_API_TOKEN", "env-token");
            jail.set_env("DISTRIBUTION_SERVER_BIND", "127.0.0.1:8088");
            jail.set_env("DISTRIBUTION_LOG_LEVEL", "debug");
            jail.set_env(CONFIG_PATH_VAR, "missing.toml");

            let config = load_and_validate().map_err(|e| e.to_string())?;
            assert_eq!(config.store.api_token, "env-token");
            assert_eq!(config.server.bind, "127.0.0.1:8088");
            assert_eq!(config.log_level, "debug");
            Ok(())
        });
    }

    #[test]
    fn test_env_key_mapping() {
        assert_eq!(env_key_to_path("store_api_token"), "store.api_token");
        assert_eq!(env_key_to_path("cache_table_id_ttl_secs"), "cache.table_id_ttl_secs");
        assert_eq!(env_key_to_path("log_file"), "log_file");
        assert_eq!(env_key_to_path("storeroom"), "storeroom");
    }
}
