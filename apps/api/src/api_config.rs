use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use carelink_application::{
    DEFAULT_DISCLOSURE_CACHE_TTL_SECONDS, DEFAULT_STORE_MAX_ATTEMPTS,
    DEFAULT_STORE_RETRY_BASE_DELAY, DEFAULT_STORE_TIMEOUT, StoreCallPolicy,
};
use carelink_core::AppError;
use tracing_subscriber::EnvFilter;

const MIN_SHARED_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisclosureCacheBackend {
    InMemory,
    Redis,
}

impl DisclosureCacheBackend {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim() {
            "in_memory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            other => Err(AppError::Validation(format!(
                "DISCLOSURE_CACHE_BACKEND must be either 'in_memory' or 'redis', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub database_max_connections: u32,
    pub consent_api_shared_secret: String,
    pub api_host: String,
    pub api_port: u16,
    pub redis_url: Option<String>,
    pub disclosure_cache_backend: DisclosureCacheBackend,
    pub disclosure_cache_ttl_seconds: u32,
    pub store_policy: StoreCallPolicy,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_non_empty_env("DATABASE_URL")?;
        let database_max_connections = parsed_env("DATABASE_MAX_CONNECTIONS", 10_u32)?;

        let consent_api_shared_secret = validate_shared_secret(required_env(
            "CONSENT_API_SHARED_SECRET",
        )?)?;

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parsed_env("API_PORT", 3001_u16)?;

        let redis_url = env::var("REDIS_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let disclosure_cache_backend = DisclosureCacheBackend::parse(
            env::var("DISCLOSURE_CACHE_BACKEND")
                .unwrap_or_else(|_| "in_memory".to_owned())
                .as_str(),
        )?;
        if disclosure_cache_backend == DisclosureCacheBackend::Redis && redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when DISCLOSURE_CACHE_BACKEND=redis".to_owned(),
            ));
        }
        let disclosure_cache_ttl_seconds = parsed_env(
            "DISCLOSURE_CACHE_TTL_SECONDS",
            DEFAULT_DISCLOSURE_CACHE_TTL_SECONDS,
        )?;

        let store_policy = store_policy_from_millis(
            parsed_env(
                "STORE_TIMEOUT_MS",
                duration_millis(DEFAULT_STORE_TIMEOUT),
            )?,
            parsed_env("STORE_RETRY_MAX_ATTEMPTS", DEFAULT_STORE_MAX_ATTEMPTS)?,
            parsed_env(
                "STORE_RETRY_BASE_DELAY_MS",
                duration_millis(DEFAULT_STORE_RETRY_BASE_DELAY),
            )?,
        )?;

        Ok(Self {
            migrate_only,
            database_url,
            database_max_connections,
            consent_api_shared_secret,
            api_host,
            api_port,
            redis_url,
            disclosure_cache_backend,
            disclosure_cache_ttl_seconds,
            store_policy,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn validate_shared_secret(secret: String) -> Result<String, AppError> {
    if secret.trim().len() < MIN_SHARED_SECRET_LENGTH {
        return Err(AppError::Validation(format!(
            "CONSENT_API_SHARED_SECRET must be at least {MIN_SHARED_SECRET_LENGTH} characters"
        )));
    }

    Ok(secret)
}

fn store_policy_from_millis(
    timeout_ms: u64,
    max_attempts: u32,
    base_delay_ms: u64,
) -> Result<StoreCallPolicy, AppError> {
    if timeout_ms == 0 {
        return Err(AppError::Validation(
            "STORE_TIMEOUT_MS must be greater than zero".to_owned(),
        ));
    }
    if max_attempts == 0 {
        return Err(AppError::Validation(
            "STORE_RETRY_MAX_ATTEMPTS must be at least 1".to_owned(),
        ));
    }

    Ok(StoreCallPolicy {
        timeout: Duration::from_millis(timeout_ms),
        max_attempts,
        base_delay: Duration::from_millis(base_delay_ms),
    })
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
}

fn parsed_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => parse_value(name, value.as_str()),
        _ => Ok(default),
    }
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}
