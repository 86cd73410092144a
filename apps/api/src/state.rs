use std::sync::Arc;

use carelink_application::ConsentService;
use sqlx::PgPool;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub consent_service: ConsentService,
    pub postgres_pool: PgPool,
    pub redis_client: Option<redis::Client>,
    pub redis_required: bool,
    pub api_shared_secret: Arc<str>,
}
