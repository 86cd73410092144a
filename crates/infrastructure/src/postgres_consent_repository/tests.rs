use carelink_application::{
    ApproveDisclosureInput, DisclosureRequestRepository, PermissionGrantRepository,
    RevokeDisclosureInput,
};
use carelink_core::AppError;
use carelink_domain::{
    DisclosureRequest, DisclosureStatus, EffectivePermissionSet, FieldKey, FieldSet,
    PermissionGrant,
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresConsentRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres consent tests: {error}");
    }

    Some(pool)
}

async fn ensure_user(pool: &PgPool, user_id: &str) {
    let insert = sqlx::query(
        r#"
        INSERT INTO user_profiles (user_id, payload)
        VALUES ($1, '{}'::jsonb)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await;

    assert!(insert.is_ok());
}

async fn seeded_pair(pool: &PgPool) -> (String, String) {
    let requester_id = format!("requester-{}", Uuid::new_v4());
    let target_id = format!("target-{}", Uuid::new_v4());
    ensure_user(pool, requester_id.as_str()).await;
    ensure_user(pool, target_id.as_str()).await;
    (requester_id, target_id)
}

async fn insert_pending(
    repository: &PostgresConsentRepository,
    requester_id: &str,
    target_id: &str,
) -> DisclosureRequest {
    let fields: FieldSet = vec![FieldKey::Phone, FieldKey::Address].into();
    let request =
        DisclosureRequest::new_pending(requester_id, target_id, fields, None, None, Utc::now());
    assert!(request.is_ok());

    let inserted = repository
        .insert_request(request.unwrap_or_else(|_| unreachable!()))
        .await;
    assert!(inserted.is_ok());
    inserted.unwrap_or_else(|_| unreachable!())
}

fn approval(request: &DisclosureRequest, fields: FieldSet) -> ApproveDisclosureInput {
    ApproveDisclosureInput {
        request_id: request.id(),
        shared_fields: fields.clone(),
        grant_fields: fields,
        expires_at: None,
        responded_at: Utc::now(),
    }
}

#[tokio::test]
async fn approve_writes_request_and_grants_together() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresConsentRepository::new(pool.clone());
    let (requester_id, target_id) = seeded_pair(&pool).await;
    let request = insert_pending(&repository, &requester_id, &target_id).await;

    let pending = repository.list_pending_for_target(&target_id).await;
    assert!(matches!(pending, Ok(ref requests) if requests.len() == 1));

    let approved = repository
        .approve_request(approval(&request, vec![FieldKey::Phone].into()))
        .await;
    assert!(matches!(
        approved,
        Ok(ref request) if request.status() == DisclosureStatus::Approved
    ));

    let grants = repository
        .list_grants_for_pair(&target_id, &requester_id)
        .await;
    assert!(matches!(
        grants.as_deref(),
        Ok([grant]) if grant.field == FieldKey::Phone && grant.request_id == request.id()
    ));

    let stored = repository.find_request(request.id()).await;
    assert!(matches!(
        stored,
        Ok(Some(ref stored)) if stored.shared_fields().as_slice() == [FieldKey::Phone]
    ));
}

#[tokio::test]
async fn second_approval_is_a_conflict() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresConsentRepository::new(pool.clone());
    let (requester_id, target_id) = seeded_pair(&pool).await;
    let request = insert_pending(&repository, &requester_id, &target_id).await;

    let (left, right) = tokio::join!(
        repository.approve_request(approval(&request, vec![FieldKey::Phone].into())),
        repository.approve_request(approval(&request, vec![FieldKey::Phone].into())),
    );

    assert!(left.is_ok() != right.is_ok());
    assert!(
        matches!(left, Err(AppError::Conflict(_))) || matches!(right, Err(AppError::Conflict(_)))
    );

    let grants = repository.list_grants_for_request(request.id()).await;
    assert!(matches!(grants, Ok(ref grants) if grants.len() == 1));
}

#[tokio::test]
async fn declined_request_cannot_be_approved() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresConsentRepository::new(pool.clone());
    let (requester_id, target_id) = seeded_pair(&pool).await;
    let request = insert_pending(&repository, &requester_id, &target_id).await;

    let declined = repository.decline_request(request.id(), Utc::now()).await;
    assert!(matches!(
        declined,
        Ok(ref request) if request.status() == DisclosureStatus::Declined
    ));

    let approved = repository
        .approve_request(approval(&request, vec![FieldKey::Phone].into()))
        .await;
    assert!(matches!(approved, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn revocation_stamps_pair_grants_for_shared_fields() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresConsentRepository::new(pool.clone());
    let (requester_id, target_id) = seeded_pair(&pool).await;
    let request = insert_pending(&repository, &requester_id, &target_id).await;

    let approved = repository
        .approve_request(approval(
            &request,
            vec![FieldKey::Phone, FieldKey::Address].into(),
        ))
        .await;
    assert!(approved.is_ok());

    let revoked_at = Utc::now();
    let revoked = repository
        .revoke_request(RevokeDisclosureInput {
            request_id: request.id(),
            revoked_at,
        })
        .await;
    assert!(matches!(revoked, Ok(ref request) if request.revoked_at().is_some()));

    let grants = repository
        .list_grants_for_pair(&target_id, &requester_id)
        .await;
    assert!(grants.is_ok());
    let grants = grants.unwrap_or_default();
    assert_eq!(grants.len(), 2);
    assert!(grants.iter().all(|grant| grant.revoked_at.is_some()));

    let effective =
        EffectivePermissionSet::compute(&target_id, &requester_id, grants, Utc::now(), true);
    assert!(effective.is_empty());
}

#[tokio::test]
async fn missing_grants_are_inserted_once() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresConsentRepository::new(pool.clone());
    let (requester_id, target_id) = seeded_pair(&pool).await;
    let request = insert_pending(&repository, &requester_id, &target_id).await;

    let approved = repository
        .approve_request(ApproveDisclosureInput {
            grant_fields: FieldSet::new(),
            expires_at: Some(Utc::now() + Duration::days(1)),
            ..approval(&request, vec![FieldKey::Phone].into())
        })
        .await;
    assert!(approved.is_ok());
    let approved = approved.unwrap_or_else(|_| unreachable!());

    let missing = || PermissionGrant::for_request(&approved, approved.shared_fields(), Utc::now());
    let first = repository.insert_missing_grants(missing()).await;
    let second = repository.insert_missing_grants(missing()).await;

    assert_eq!(first.ok(), Some(1));
    assert_eq!(second.ok(), Some(0));
}
