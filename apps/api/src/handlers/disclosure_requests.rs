use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use carelink_core::UserIdentity;
use carelink_domain::DisclosureRequestId;

use crate::dto::{
    CreateDisclosureRequestRequest, DisclosureRequestResponse, RespondToDisclosureRequestRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn create_disclosure_request_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateDisclosureRequestRequest>,
) -> ApiResult<(StatusCode, Json<DisclosureRequestResponse>)> {
    let request = state
        .consent_service
        .create_request(&user, payload.into_input()?)
        .await?;

    Ok((StatusCode::CREATED, Json(request.into())))
}

pub async fn list_pending_disclosure_requests_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<DisclosureRequestResponse>>> {
    let requests = state.consent_service.get_pending_requests(&user).await?;

    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

pub async fn list_sent_disclosure_requests_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<DisclosureRequestResponse>>> {
    let requests = state.consent_service.get_sent_requests(&user).await?;

    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

pub async fn respond_to_disclosure_request_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(request_id): Path<String>,
    Json(payload): Json<RespondToDisclosureRequestRequest>,
) -> ApiResult<Json<DisclosureRequestResponse>> {
    let request_id = DisclosureRequestId::parse(request_id.as_str())?;
    let request = state
        .consent_service
        .respond_to_request(&user, request_id, payload.into_input()?)
        .await?;

    Ok(Json(request.into()))
}

pub async fn revoke_disclosure_request_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<DisclosureRequestResponse>> {
    let request_id = DisclosureRequestId::parse(request_id.as_str())?;
    let request = state
        .consent_service
        .revoke_access(&user, request_id)
        .await?;

    Ok(Json(request.into()))
}
