use std::sync::Arc;

use carelink_application::{
    ConsentService, DisclosureCache, DisclosureRequestRepository, PermissionGrantRepository,
    ProfileStore, UserDirectory,
};
use carelink_core::{AppError, AppResult};
use carelink_infrastructure::{
    InMemoryDisclosureCache, PostgresConsentRepository, PostgresProfileStore,
    RedisDisclosureCache, TracingNotificationDispatcher,
};
use sqlx::PgPool;

use crate::api_config::{ApiConfig, DisclosureCacheBackend};
use crate::state::AppState;

use super::redis::{DISCLOSURE_CACHE_KEY_PREFIX, build_redis_client};

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> AppResult<AppState> {
    let redis_client = build_redis_client(config)?;
    let disclosure_cache = build_disclosure_cache(config, redis_client.clone())?;

    let consent_repository = Arc::new(PostgresConsentRepository::new(pool.clone()));
    let profile_store = Arc::new(PostgresProfileStore::new(pool.clone()));
    let request_repository: Arc<dyn DisclosureRequestRepository> = consent_repository.clone();
    let grant_repository: Arc<dyn PermissionGrantRepository> = consent_repository;
    let user_directory: Arc<dyn UserDirectory> = profile_store.clone();
    let profile_store: Arc<dyn ProfileStore> = profile_store;

    let consent_service = ConsentService::new(
        request_repository,
        grant_repository,
        user_directory,
        profile_store,
        Arc::new(TracingNotificationDispatcher),
    )
    .with_store_policy(config.store_policy)
    .with_cache(disclosure_cache, config.disclosure_cache_ttl_seconds);

    Ok(AppState {
        consent_service,
        postgres_pool: pool,
        redis_client,
        redis_required: config.disclosure_cache_backend == DisclosureCacheBackend::Redis,
        api_shared_secret: Arc::from(config.consent_api_shared_secret.as_str()),
    })
}

fn build_disclosure_cache(
    config: &ApiConfig,
    redis_client: Option<redis::Client>,
) -> AppResult<Arc<dyn DisclosureCache>> {
    match config.disclosure_cache_backend {
        DisclosureCacheBackend::InMemory => Ok(Arc::new(InMemoryDisclosureCache::new())),
        DisclosureCacheBackend::Redis => {
            let redis_client = redis_client.ok_or_else(|| {
                AppError::Validation(
                    "REDIS_URL is required when DISCLOSURE_CACHE_BACKEND=redis".to_owned(),
                )
            })?;
            Ok(Arc::new(RedisDisclosureCache::new(
                redis_client,
                DISCLOSURE_CACHE_KEY_PREFIX,
            )))
        }
    }
}
