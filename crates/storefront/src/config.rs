//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ROASTERY_API_BASE_URL` - Base URL of the ordering backend
//!
//! ## Optional
//! - `ROASTERY_IMAGE_BASE_URL` - Static-asset prefix for product images
//!   (default: `<api base>/images/`)
//! - `ROASTERY_CART_STATE_PATH` - File holding the persisted cart
//!   identifier (default: `.roastery-cart`)
//! - `ROASTERY_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `ROASTERY_CART_CREATION` - `eager` or `lazy` cart minting
//!   (default: lazy)
//! - `ROASTERY_ADMIN_EMAIL` / `ROASTERY_ADMIN_PASSWORD` - Admin console
//!   credentials; both or neither must be set

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::session::CartCreation;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the ordering backend
    pub api_base_url: Url,
    /// Static-asset prefix bare image filenames are resolved against
    pub image_base_url: Url,
    /// File holding the persisted cart identifier
    pub cart_state_path: PathBuf,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// Eager or lazy cart minting
    pub cart_creation: CartCreation,
    /// Admin console credentials, when configured
    pub admin: Option<AdminConfig>,
}

/// Admin console credentials.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(
            "ROASTERY_API_BASE_URL",
            &get_required_env("ROASTERY_API_BASE_URL")?,
        )?;

        let image_base_url = match get_optional_env("ROASTERY_IMAGE_BASE_URL") {
            Some(raw) => parse_base_url("ROASTERY_IMAGE_BASE_URL", &raw)?,
            None => default_image_base(&api_base_url)?,
        };

        let cart_state_path =
            PathBuf::from(get_env_or_default("ROASTERY_CART_STATE_PATH", ".roastery-cart"));

        let http_timeout = get_env_or_default("ROASTERY_HTTP_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ROASTERY_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        let cart_creation =
            parse_cart_creation(&get_env_or_default("ROASTERY_CART_CREATION", "lazy"))?;

        let admin = admin_from_env()?;

        Ok(Self {
            api_base_url,
            image_base_url,
            cart_state_path,
            http_timeout,
            cart_creation,
            admin,
        })
    }
}

fn admin_from_env() -> Result<Option<AdminConfig>, ConfigError> {
    let email = get_optional_env("ROASTERY_ADMIN_EMAIL");
    let password = get_optional_env("ROASTERY_ADMIN_PASSWORD");

    match (email, password) {
        (Some(email), Some(password)) => Ok(Some(AdminConfig {
            email,
            password: SecretString::from(password),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::MissingEnvVar(
            "ROASTERY_ADMIN_PASSWORD".to_string(),
        )),
        (None, Some(_)) => Err(ConfigError::MissingEnvVar(
            "ROASTERY_ADMIN_EMAIL".to_string(),
        )),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an http(s) base URL.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }
    Ok(url)
}

/// Derive the default image prefix, `<api base>/images/`, with the
/// trailing slash that makes joins append rather than replace.
fn default_image_base(api_base_url: &Url) -> Result<Url, ConfigError> {
    let joined = format!("{}/images/", api_base_url.as_str().trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| {
        ConfigError::InvalidEnvVar("ROASTERY_API_BASE_URL".to_string(), e.to_string())
    })
}

/// Parse the cart-creation mode.
fn parse_cart_creation(raw: &str) -> Result<CartCreation, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "eager" => Ok(CartCreation::Eager),
        "lazy" => Ok(CartCreation::Lazy),
        other => Err(ConfigError::InvalidEnvVar(
            "ROASTERY_CART_CREATION".to_string(),
            format!("expected \"eager\" or \"lazy\", got {other:?}"),
        )),
    }
}
