use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Top-level application configuration.
///
/// Loaded from `quickcare.toml` (or the path in `QUICKCARE_CONFIG`),
/// then overridden by `QUICKCARE__`-prefixed environment variables,
/// e.g. `QUICKCARE__SERVER__PORT=9090`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub pagination: PaginationSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Initial admin account, seeded on first start.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.auth.jwt_secret.trim().is_empty() {
            return Err("auth.jwt_secret must not be empty".into());
        }
        if self.auth.jwt_secret.len() < 32 {
            return Err("auth.jwt_secret must be at least 32 bytes".into());
        }
        if self.auth.token_ttl_secs == 0 {
            return Err("auth.token_ttl_secs must be > 0".into());
        }
        if self.pagination.default_limit == 0 {
            return Err("pagination.default_limit must be > 0".into());
        }
        if self.pagination.max_limit == 0 {
            return Err("pagination.max_limit must be > 0".into());
        }
        if self.pagination.default_limit > self.pagination.max_limit {
            return Err("pagination.default_limit must be <= pagination.max_limit".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.bootstrap.enabled {
            if self.bootstrap.admin_email.trim().is_empty() {
                return Err("bootstrap.admin_email must not be empty".into());
            }
            if self.bootstrap.admin_password.len() < MIN_PASSWORD_LEN {
                return Err(format!(
                    "bootstrap.admin_password must be at least {MIN_PASSWORD_LEN} characters"
                ));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

/// Minimum accepted password length, shared with request validation.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HMAC secret for access tokens. Must be set in production;
    /// the default is only usable for local development.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_jwt_secret() -> String {
    "quickcare-dev-secret-change-me-in-production".into()
}
fn default_token_ttl() -> u64 {
    quickcare_auth::token::DEFAULT_TOKEN_TTL_SECS
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationSettings {
    #[serde(default = "default_page_limit")]
    pub default_limit: u32,
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

fn default_page_limit() -> u32 {
    quickcare_storage::DEFAULT_PAGE_SIZE
}
fn default_max_limit() -> u32 {
    100
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_bootstrap_enabled")]
    pub enabled: bool,
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

fn default_bootstrap_enabled() -> bool {
    true
}
fn default_admin_name() -> String {
    "Administrator".into()
}
fn default_admin_email() -> String {
    "admin@quickcare.local".into()
}
fn default_admin_password() -> String {
    "admin123".into()
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: default_bootstrap_enabled(),
            admin_name: default_admin_name(),
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("quickcare.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment overrides, e.g. QUICKCARE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("QUICKCARE")
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
}
