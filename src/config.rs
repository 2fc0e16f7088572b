//! Runtime configuration read from the environment.

use chrono::Duration;

use crate::auth::{TokenIssuer, DEFAULT_TOKEN_TTL_HOURS};

const DEV_SECRET: &str = "development_only_secret_not_for_production";

/// Token signing configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for HS256 tokens.
    pub secret: Vec<u8>,
    /// Token lifetime.
    pub token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: DEV_SECRET.as_bytes().to_vec(),
            token_ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        }
    }
}

impl AuthConfig {
    /// Read `FORUM_JWT_SECRET` and `FORUM_TOKEN_TTL_MINUTES`.
    ///
    /// Falls back to a development secret with a warning when the secret is
    /// unset, and to an eight hour lifetime when the TTL is unset or invalid.
    pub fn from_env() -> Self {
        let secret = std::env::var("FORUM_JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(String::into_bytes)
            .unwrap_or_else(|| {
                tracing::warn!(
                    "FORUM_JWT_SECRET not set, using development secret. \
                     Set this for production!"
                );
                DEV_SECRET.as_bytes().to_vec()
            });

        let token_ttl = std::env::var("FORUM_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|v| parse_ttl_minutes(&v))
            .unwrap_or_else(|| Duration::hours(DEFAULT_TOKEN_TTL_HOURS));

        Self { secret, token_ttl }
    }

    /// Build the token issuer for this configuration.
    pub fn issuer(&self) -> TokenIssuer {
        TokenIssuer::new(&self.secret, self.token_ttl)
    }
}

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

fn parse_ttl_minutes(raw: &str) -> Option<Duration> {
    let parsed = raw
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|minutes| (1..=MAX_TOKEN_TTL_MINUTES).contains(minutes))
        .and_then(Duration::try_minutes);
    if parsed.is_none() {
        tracing::warn!(value = %raw, "Ignoring invalid FORUM_TOKEN_TTL_MINUTES");
    }
    parsed
}

/// Listen address configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Read `HOST` and `PORT`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
