use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use carelink_core::{AppError, AppResult, UserIdentity};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiResult;
use crate::state::AppState;

/// Header carrying the marketplace user the backend acts for.
pub const SUBJECT_HEADER: &str = "x-carelink-subject";

pub async fn require_consent_caller(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = authenticate_caller(request.headers(), &state.api_shared_secret)
        .inspect_err(|error| warn!(path = %request.uri().path(), %error, "rejected api caller"))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn authenticate_caller(headers: &HeaderMap, shared_secret: &str) -> AppResult<UserIdentity> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| AppError::Unauthorized("bearer token required".to_owned()))?;

    if !secrets_match(token.as_bytes(), shared_secret.as_bytes()) {
        return Err(AppError::Unauthorized("invalid bearer token".to_owned()));
    }

    let subject = headers
        .get(SUBJECT_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("{SUBJECT_HEADER} header required")))?;

    UserIdentity::from_subject(subject)
}

fn secrets_match(provided: &[u8], expected: &[u8]) -> bool {
    bool::from(provided.ct_eq(expected))
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};
    use carelink_core::AppError;

    use super::{SUBJECT_HEADER, authenticate_caller, secrets_match};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn headers(authorization: Option<&'static str>, subject: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(authorization) = authorization {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(authorization));
        }
        if let Some(subject) = subject {
            headers.insert(SUBJECT_HEADER, HeaderValue::from_static(subject));
        }
        headers
    }

    #[test]
    fn valid_token_and_subject_produce_identity() {
        let identity = authenticate_caller(
            &headers(
                Some("Bearer 0123456789abcdef0123456789abcdef"),
                Some(" u1 "),
            ),
            SECRET,
        );

        assert!(identity.is_ok());
        let identity = identity.unwrap_or_else(|_| unreachable!());
        assert_eq!(identity.subject(), "u1");
    }

    #[test]
    fn missing_or_wrong_token_is_unauthorized() {
        assert!(matches!(
            authenticate_caller(&headers(None, Some("u1")), SECRET),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate_caller(&headers(Some("Bearer nope"), Some("u1")), SECRET),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate_caller(
                &headers(Some("Basic 0123456789abcdef0123456789abcdef"), Some("u1")),
                SECRET
            ),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn missing_or_blank_subject_is_unauthorized() {
        let token = Some("Bearer 0123456789abcdef0123456789abcdef");

        assert!(matches!(
            authenticate_caller(&headers(token, None), SECRET),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate_caller(&headers(token, Some("   ")), SECRET),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn secret_comparison_checks_length_and_content() {
        assert!(secrets_match(b"abc", b"abc"));
        assert!(!secrets_match(b"abc", b"abd"));
        assert!(!secrets_match(b"abc", b"abcd"));
    }
}
