use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

/// Minimum length of the HMAC secret used to sign session tokens.
pub const MIN_SECRET_LEN: usize = 32;

/// Runtime configuration.
///
/// Sources, later ones winning: built-in defaults, an optional TOML file,
/// then `DEALROOM_*` environment variables (`__` separates nested keys,
/// e.g. `DEALROOM_RATE_LIMIT__COMMENT_LIMIT=10`).
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    /// Sets the `Secure` attribute on the session cookie.
    pub cookie_secure: bool,
    pub static_dir: String,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub comment_limit: usize,
    /// Once more distinct clients than this are tracked, the store is wiped.
    pub max_tracked_clients: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("mongodb_uri", &"[REDACTED]")
            .field("mongodb_database", &self.mongodb_database)
            .field("session_secret", &"[REDACTED]")
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("cookie_secure", &self.cookie_secure)
            .field("static_dir", &self.static_dir)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Without an explicit path, `dealroom.toml` in the working directory is
    /// read if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("dealroom").required(false),
        };

        let builder = Self::defaults()?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("DEALROOM")
                    .prefix_separator("_")
                    .separator("__"),
            );

        Self::from_builder(builder)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:3000")?
            .set_default("mongodb_uri", "mongodb://localhost:27017")?
            .set_default("mongodb_database", "dealroom")?
            .set_default("session_secret", "")?
            .set_default("session_ttl_hours", 24_i64)?
            .set_default("cookie_secure", false)?
            .set_default("static_dir", "public")?
            .set_default("rate_limit.window_secs", 60_i64)?
            .set_default("rate_limit.comment_limit", 5_i64)?
            .set_default("rate_limit.max_tracked_clients", 10_000_i64)?)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "session_secret".to_string(),
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }
        if self.session_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "session_ttl_hours".to_string(),
                "must be positive".to_string(),
            ));
        }
        if self.rate_limit.comment_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "rate_limit.comment_limit".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "rate_limit.window_secs".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
