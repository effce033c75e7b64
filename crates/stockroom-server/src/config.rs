use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};
use stockroom_db_postgres::PostgresConfig;

use crate::cache::CacheTtls;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Cache TTLs and the periodic refresher
    #[serde(default)]
    pub cache: CacheConfig,
    /// Credential signing
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn addr(&self) -> SocketAddr {
        let ip: std::net::IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::from((ip, self.server.port))
    }

    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        if let Some(seed) = &self.server.seed_admin {
            if seed.email.trim().is_empty() || seed.password.is_empty() {
                return Err("server.seed_admin requires email and password".into());
            }
        }
        // Storage validations
        if self.storage.backend == StorageBackend::Postgres
            && self
                .storage
                .postgres
                .as_ref()
                .is_none_or(|pg| pg.url.trim().is_empty())
        {
            return Err("storage.backend=postgres requires storage.postgres.url".into());
        }
        // Auth validations
        if self.auth.jwt_secret.is_empty() {
            return Err("auth.jwt_secret must not be empty".into());
        }
        if self.auth.token_lifetime_secs == 0 {
            return Err("auth.token_lifetime_secs must be > 0".into());
        }
        // Cache validations
        if self.cache.detail_ttl_secs == 0
            || self.cache.list_ttl_secs == 0
            || self.cache.refresh_ttl_secs == 0
        {
            return Err("cache TTLs must be > 0".into());
        }
        if self.cache.refresh_enabled && self.cache.refresh_interval_secs == 0 {
            return Err("cache.refresh_interval_secs must be > 0".into());
        }
        if self.redis.enabled && self.redis.url.trim().is_empty() {
            return Err("redis.enabled=true requires redis.url".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    /// Non-fatal configuration problems worth a log line at startup.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.auth.jwt_secret.len() < 32 {
            warnings.push("auth.jwt_secret is shorter than 32 bytes".to_string());
        }
        if self.auth.jwt_secret == default_jwt_secret() {
            warnings.push("auth.jwt_secret is the built-in development secret".to_string());
        }
        warnings
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Permissive CORS for browser clients
    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,
    /// Master admin created at startup when no user has this email
    #[serde(default)]
    pub seed_admin: Option<SeedAdminConfig>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}
fn default_cors_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            cors_enabled: default_cors_enabled(),
            seed_admin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAdminConfig {
    #[serde(default = "default_seed_name")]
    pub name: String,
    pub email: String,
    pub password: String,
}

fn default_seed_name() -> String {
    "Administrator".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default)]
    pub postgres: Option<PostgresConfig>,
}

/// Redis configuration for the shared cache tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades without it)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound on how long an entry lives in the per-process L1
    #[serde(default = "default_redis_l1_ttl_secs")]
    pub l1_ttl_secs: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

fn default_redis_l1_ttl_secs() -> u64 {
    60
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
            l1_ttl_secs: default_redis_l1_ttl_secs(),
        }
    }
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn l1_ttl(&self) -> Duration {
        Duration::from_secs(self.l1_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Single-entity entries written on a read miss
    #[serde(default = "default_detail_ttl_secs")]
    pub detail_ttl_secs: u64,
    /// Paginated list entries written on a read miss
    #[serde(default = "default_list_ttl_secs")]
    pub list_ttl_secs: u64,
    /// Entries written by the refresher
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    #[serde(default = "default_refresh_enabled")]
    pub refresh_enabled: bool,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_detail_ttl_secs() -> u64 {
    30 * 60
}
fn default_list_ttl_secs() -> u64 {
    5 * 60
}
fn default_refresh_ttl_secs() -> u64 {
    15 * 60
}
fn default_refresh_enabled() -> bool {
    true
}
fn default_refresh_interval_secs() -> u64 {
    10
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            detail_ttl_secs: default_detail_ttl_secs(),
            list_ttl_secs: default_list_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
            refresh_enabled: default_refresh_enabled(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn ttls(&self) -> CacheTtls {
        CacheTtls {
            detail: Duration::from_secs(self.detail_ttl_secs),
            list: Duration::from_secs(self.list_ttl_secs),
            refresh: Duration::from_secs(self.refresh_ttl_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret (STOCKROOM__AUTH__JWT_SECRET)
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,
}

fn default_jwt_secret() -> String {
    "stockroom-development-secret-change-me".into()
}
fn default_token_lifetime_secs() -> u64 {
    24 * 60 * 60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_lifetime_secs: default_token_lifetime_secs(),
        }
    }
}

impl AuthConfig {
    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    /// Default configuration file, looked up in the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "stockroom.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., STOCKROOM__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("STOCKROOM")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<AppConfig, String> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}
