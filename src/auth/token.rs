//! Session tokens.
//!
//! A token is an HS256 JWT carrying `{sub, exp}`: the username and the unix
//! second at which it stops being accepted. Tokens are stateless; nothing is
//! persisted server-side.
//!
//! ## Validation order
//!
//! 1. Decode the claims without checking the signature. Undecodable → `Invalid`.
//! 2. `exp <= now` → `Expired`, whatever the signature says.
//! 3. Verify the signature with the issuer secret → `Invalid` on mismatch.
//! 4. Missing or empty `sub` → `Invalid`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default session lifetime.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 8;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The expiry instant has passed.
    #[error("Token has expired")]
    Expired,
    /// Malformed token, bad signature or missing subject.
    #[error("Invalid token")]
    Invalid,
    /// Claims could not be signed.
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// JWT claim set.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    exp: i64,
}

/// Issues and validates session tokens with a fixed secret.
///
/// The secret and lifetime are fixed at construction for the lifetime of the
/// process.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer with an explicit lifetime.
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Create an issuer with the default 8 hour lifetime.
    pub fn with_default_ttl(secret: &[u8]) -> Self {
        Self::new(secret, Duration::hours(DEFAULT_TOKEN_TTL_HOURS))
    }

    /// Token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` valid from now.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token for `subject` as if the current time were `now`.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Encoding("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: Some(subject.to_string()),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Validate a token against the current time and return its subject.
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as if the current time were `now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let unverified = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &peek_validation())
            .map_err(|_| TokenError::Invalid)?;
        if now.timestamp() >= unverified.claims.exp {
            return Err(TokenError::Expired);
        }

        let verified = decode::<Claims>(token, &self.decoding_key, &signature_validation())
            .map_err(|e| {
                tracing::debug!(error = %e, "Token signature rejected");
                TokenError::Invalid
            })?;

        match verified.claims.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => Err(TokenError::Invalid),
        }
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Expiry is checked by hand against the caller's clock, not the library's.
fn signature_validation() -> Validation {
    let mut validation = Validation::new(ALGORITHM);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    validation
}

fn peek_validation() -> Validation {
    let mut validation = signature_validation();
    validation.insecure_disable_signature_validation();
    validation
}
