use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/fields", get(handlers::fields::list_fields_handler))
        .route(
            "/api/disclosure-requests",
            post(handlers::disclosure_requests::create_disclosure_request_handler),
        )
        .route(
            "/api/disclosure-requests/pending",
            get(handlers::disclosure_requests::list_pending_disclosure_requests_handler),
        )
        .route(
            "/api/disclosure-requests/sent",
            get(handlers::disclosure_requests::list_sent_disclosure_requests_handler),
        )
        .route(
            "/api/disclosure-requests/{request_id}/response",
            post(handlers::disclosure_requests::respond_to_disclosure_request_handler),
        )
        .route(
            "/api/disclosure-requests/{request_id}/revocation",
            post(handlers::disclosure_requests::revoke_disclosure_request_handler),
        )
        .route(
            "/api/permissions/{target_id}",
            get(handlers::permissions::viewer_permissions_handler),
        )
        .route(
            "/api/profiles/{target_id}/shared",
            get(handlers::permissions::shared_profile_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_consent_caller,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
