use carelink_core::AppError;

use crate::api_config::ApiConfig;

pub const DISCLOSURE_CACHE_KEY_PREFIX: &str = "carelink:disclosure";

/// Opens a Redis client when `REDIS_URL` is configured.
pub fn build_redis_client(config: &ApiConfig) -> Result<Option<redis::Client>, AppError> {
    config
        .redis_url
        .as_deref()
        .map(|redis_url| {
            redis::Client::open(redis_url)
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))
        })
        .transpose()
}
