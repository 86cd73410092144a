//! Infrastructure adapters for consent engine ports.

#![forbid(unsafe_code)]

mod in_memory_consent_repository;
mod in_memory_disclosure_cache;
mod in_memory_profile_store;
mod postgres_consent_repository;
mod postgres_errors;
mod postgres_profile_store;
mod profile_payload;
mod redis_disclosure_cache;
mod tracing_notification_dispatcher;

pub use in_memory_consent_repository::InMemoryConsentRepository;
pub use in_memory_disclosure_cache::InMemoryDisclosureCache;
pub use in_memory_profile_store::InMemoryProfileStore;
pub use postgres_consent_repository::PostgresConsentRepository;
pub use postgres_profile_store::PostgresProfileStore;
pub use redis_disclosure_cache::RedisDisclosureCache;
pub use tracing_notification_dispatcher::TracingNotificationDispatcher;
