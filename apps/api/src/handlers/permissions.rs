use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use carelink_core::UserIdentity;
use serde::Deserialize;

use crate::dto::{EffectivePermissionsResponse, SharedProfileResponse};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ViewerPermissionsQuery {
    /// Defaults to the caller.
    pub viewer_id: Option<String>,
    pub include_expired: Option<bool>,
}

pub async fn viewer_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(target_id): Path<String>,
    Query(query): Query<ViewerPermissionsQuery>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let viewer_id = query
        .viewer_id
        .unwrap_or_else(|| user.subject().to_owned());
    let permissions = state
        .consent_service
        .get_viewer_permissions(
            &user,
            target_id.as_str(),
            viewer_id.as_str(),
            query.include_expired.unwrap_or(false),
        )
        .await?;

    Ok(Json(permissions.into()))
}

pub async fn shared_profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(target_id): Path<String>,
) -> ApiResult<Json<SharedProfileResponse>> {
    let profile = state
        .consent_service
        .get_shared_profile(&user, target_id.as_str())
        .await?;

    Ok(Json(profile.into()))
}
