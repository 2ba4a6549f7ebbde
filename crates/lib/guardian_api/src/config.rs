//! API server configuration.

use std::str::FromStr;
use std::sync::Arc;

use guardian_core::auth::jwt::{DEFAULT_SESSION_TTL_SECS, resolve_jwt_secret};
use guardian_core::auth::password::DEFAULT_BCRYPT_COST;
use guardian_core::auth::verifier::SessionKeys;
use guardian_core::complaints::TransitionPolicy;
use guardian_core::media::cloudinary::{
    CloudinaryConfig, CloudinaryHost, DEFAULT_API_BASE, DEFAULT_MAX_DIMENSION,
};
use guardian_core::media::{
    DEFAULT_MAX_FILE_BYTES, DEFAULT_MAX_FILES, ImageHost, MediaIntake, MediaLimits,
    UnconfiguredHost,
};
use tracing::warn;
use url::Url;

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Session lifetime in seconds.
    pub session_ttl_secs: i64,
    /// bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
    pub media_limits: MediaLimits,
    pub transition_policy: TransitionPolicy,
    /// Mark the session cookie `Secure`.
    pub cookie_secure: bool,
    /// Image host credentials; `None` disables the primary upload path.
    pub cloudinary: Option<CloudinaryConfig>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("media_limits", &self.media_limits)
            .field("transition_policy", &self.transition_policy)
            .field("cookie_secure", &self.cookie_secure)
            .field("cloudinary", &self.cloudinary)
            .finish_non_exhaustive()
    }
}

/// Read `key`, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparsable environment value");
            default
        }),
        _ => default,
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                  | Default                                      |
    /// |---------------------------|----------------------------------------------|
    /// | `BIND_ADDR`               | `127.0.0.1:3100`                             |
    /// | `DATABASE_URL`            | `postgres://localhost:5432/cityguardian`     |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file             |
    /// | `SESSION_MAX_AGE_SECS`    | `2592000` (30 days)                          |
    /// | `BCRYPT_COST`             | `10`                                         |
    /// | `MAX_UPLOAD_BYTES`        | `10485760`                                   |
    /// | `MAX_UPLOAD_FILES`        | `5`                                          |
    /// | `STATUS_TRANSITIONS`      | `unrestricted` (or `forward-only`)           |
    /// | `COOKIE_SECURE`           | `false`                                      |
    /// | `CLOUDINARY_*`            | unset (uploads fail upstream)                |
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1:3100".to_string()),
            database_url: env_or(
                "DATABASE_URL",
                "postgres://localhost:5432/cityguardian".to_string(),
            ),
            jwt_secret: resolve_jwt_secret(),
            session_ttl_secs: env_or("SESSION_MAX_AGE_SECS", DEFAULT_SESSION_TTL_SECS),
            bcrypt_cost: env_or("BCRYPT_COST", DEFAULT_BCRYPT_COST),
            media_limits: MediaLimits {
                max_file_bytes: env_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_FILE_BYTES),
                max_files: env_or("MAX_UPLOAD_FILES", DEFAULT_MAX_FILES),
            },
            transition_policy: env_or("STATUS_TRANSITIONS", TransitionPolicy::default()),
            cookie_secure: env_or("COOKIE_SECURE", false),
            cloudinary: cloudinary_from_env(),
        }
    }

    /// Defaults suitable for tests: fixed secret, cheapest bcrypt cost.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            database_url: String::new(),
            jwt_secret: jwt_secret.into(),
            session_ttl_secs: 3600,
            bcrypt_cost: 4,
            media_limits: MediaLimits::default(),
            transition_policy: TransitionPolicy::default(),
            cookie_secure: false,
            cloudinary: None,
        }
    }

    pub fn session_keys(&self) -> SessionKeys {
        SessionKeys::new(self.jwt_secret.as_bytes(), self.session_ttl_secs)
    }

    /// Media intake over the configured image host.
    pub fn media_intake(&self) -> MediaIntake {
        let host: Arc<dyn ImageHost> = match &self.cloudinary {
            Some(c) => Arc::new(CloudinaryHost::new(c.clone())),
            None => {
                warn!("Cloudinary is not configured; only inline uploads will succeed");
                Arc::new(UnconfiguredHost)
            }
        };
        MediaIntake::new(host, self.media_limits)
    }
}

fn cloudinary_from_env() -> Option<CloudinaryConfig> {
    let cloud_name = env_nonempty("CLOUDINARY_CLOUD_NAME")?;
    let api_key = env_nonempty("CLOUDINARY_API_KEY")?;
    let api_secret = env_nonempty("CLOUDINARY_API_SECRET")?;
    let api_base = env_nonempty("CLOUDINARY_API_BASE")
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
        .parse::<Url>()
        .map_err(|e| warn!("invalid CLOUDINARY_API_BASE: {e}"))
        .ok()?;
    Some(CloudinaryConfig {
        cloud_name,
        api_key,
        api_secret,
        folder: env_or("CLOUDINARY_FOLDER", "cityguardian".to_string()),
        api_base,
        max_dimension: env_or("CLOUDINARY_MAX_DIMENSION", DEFAULT_MAX_DIMENSION),
    })
}
