//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LARDER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `LARDER_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `BRAINTREE_MERCHANT_ID` - Braintree merchant account ID
//! - `BRAINTREE_PUBLIC_KEY` - Braintree API public key
//! - `BRAINTREE_PRIVATE_KEY` - Braintree API private key
//!
//! ## Optional
//! - `LARDER_HOST` - Bind address (default: 127.0.0.1)
//! - `LARDER_PORT` - Listen port (default: 8000)
//! - `LARDER_TOKEN_TTL_HOURS` - Session token lifetime (default: 168)
//! - `LARDER_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `BRAINTREE_ENVIRONMENT` - `sandbox` or `production` (default: sandbox)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
/// Ten years.
const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365 * 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Session token signing secret
    pub jwt_secret: SecretString,
    /// How long an issued session token stays valid
    pub token_ttl: Duration,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Payment processor configuration
    pub braintree: BraintreeConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Braintree environment selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraintreeEnvironment {
    Sandbox,
    Production,
}

impl BraintreeEnvironment {
    /// GraphQL endpoint for this environment.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Sandbox => "https://payments.sandbox.braintree-api.com/graphql",
            Self::Production => "https://payments.braintree-api.com/graphql",
        }
    }
}

impl std::str::FromStr for BraintreeEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(format!("expected 'sandbox' or 'production', got '{other}'")),
        }
    }
}

/// Braintree API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct BraintreeConfig {
    /// Sandbox or production
    pub environment: BraintreeEnvironment,
    /// Merchant account ID
    pub merchant_id: String,
    /// API public key (basic auth username)
    pub public_key: String,
    /// API private key (basic auth password)
    pub private_key: SecretString,
}

impl std::fmt::Debug for BraintreeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BraintreeConfig")
            .field("environment", &self.environment)
            .field("merchant_id", &self.merchant_id)
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("LARDER_DATABASE_URL")?;
        let host = parse_env("LARDER_HOST", "127.0.0.1")?;
        let port = parse_env("LARDER_PORT", "8000")?;
        let jwt_secret = get_validated_secret("LARDER_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "LARDER_JWT_SECRET")?;
        let token_ttl = token_ttl(parse_env("LARDER_TOKEN_TTL_HOURS", "168")?)?;
        let cors_origins = get_optional_env("LARDER_CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            token_ttl,
            cors_origins,
            braintree: BraintreeConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl BraintreeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            environment: parse_env("BRAINTREE_ENVIRONMENT", "sandbox")?,
            merchant_id: get_required_env("BRAINTREE_MERCHANT_ID")?,
            public_key: get_required_env("BRAINTREE_PUBLIC_KEY")?,
            private_key: get_validated_secret("BRAINTREE_PRIVATE_KEY")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, using `default` when it is unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Token lifetime from `LARDER_TOKEN_TTL_HOURS`.
fn token_ttl(hours: u64) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| {
        ConfigError::InvalidEnvVar("LARDER_TOKEN_TTL_HOURS".to_string(), reason.to_string())
    };
    if hours == 0 {
        return Err(invalid("must be at least 1 hour"));
    }
    if hours > MAX_TOKEN_TTL_HOURS {
        return Err(invalid(&format!("must be at most {MAX_TOKEN_TTL_HOURS} hours")));
    }
    hours
        .checked_mul(60 * 60)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid("too large"))
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that the token secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn braintree() -> BraintreeConfig {
        BraintreeConfig {
            environment: BraintreeEnvironment::Sandbox,
            merchant_id: "merchant_value".to_string(),
            public_key: "public_key_value".to_string(),
            private_key: SecretString::from("super_secret_private_key"),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-secret-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_jwt_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_jwt_secret(&secret, "TEST_JWT").is_err());
    }

    #[test]
    fn test_parse_origins_skips_blanks() {
        assert_eq!(
            parse_origins("http://localhost:3000, ,https://shop.test"),
            vec!["http://localhost:3000", "https://shop.test"]
        );
    }

    #[test]
    fn test_token_ttl_bounds() {
        assert_eq!(token_ttl(168).unwrap(), Duration::from_secs(168 * 3600));
        assert!(matches!(
            token_ttl(u64::MAX),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(token_ttl(MAX_TOKEN_TTL_HOURS + 1).is_err());
        assert!(token_ttl(0).is_err());
    }

    #[test]
    fn test_braintree_environment() {
        assert_eq!(
            "Production".parse::<BraintreeEnvironment>().unwrap(),
            BraintreeEnvironment::Production
        );
        assert!("staging".parse::<BraintreeEnvironment>().is_err());
        assert!(BraintreeEnvironment::Sandbox.endpoint().contains("sandbox"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            jwt_secret: SecretString::from("x".repeat(32)),
            token_ttl: Duration::from_secs(3600),
            cors_origins: Vec::new(),
            braintree: braintree(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8000);
    }

    #[test]
    fn test_braintree_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", braintree());

        assert!(debug_output.contains("merchant_value"));
        assert!(debug_output.contains("public_key_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_private_key"));
    }
}
