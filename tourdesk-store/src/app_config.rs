use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use tourdesk_shared::Masked;

/// Database URL that selects the in-memory repositories
pub const MEMORY_DATABASE_URL: &str = "memory";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Base of the URLs handed out for uploaded files, without trailing slash
    pub public_url: String,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Masked<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.expose() == MEMORY_DATABASE_URL
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Masked<String>,
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_seconds: u64,
    pub google_client_id: Option<String>,
    /// Accounts registered with these emails become administrators
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

fn default_jwt_expiration() -> u64 {
    7 * 24 * 60 * 60
}

impl AuthConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.trim().eq_ignore_ascii_case(email.trim()))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub root: PathBuf,
    #[serde(default = "default_profile_bytes")]
    pub max_profile_bytes: usize,
    #[serde(default = "default_package_image_bytes")]
    pub max_package_image_bytes: usize,
    #[serde(default = "default_package_images")]
    pub max_package_images: usize,
}

fn default_profile_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_package_image_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_package_images() -> usize {
    5
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new("config"))
    }

    pub fn load_from(dir: &Path) -> Result<Self, config::ConfigError> {
        Self::load_with_env(dir, None)
    }

    /// `env` replaces the process environment when given
    fn load_with_env(
        dir: &Path,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name(&dir.join("default").to_string_lossy()))
            // Add in the current environment file
            // Note that this file is _optional_
            .add_source(config::File::with_name(&dir.join(&run_mode).to_string_lossy()).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name(&dir.join("local").to_string_lossy()).required(false))
            // Eg.. `TOURDESK_SERVER__PORT=8080` would set `server.port`
            .add_source(
                config::Environment::with_prefix("TOURDESK")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.admin_emails")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        s.try_deserialize()
    }
}
