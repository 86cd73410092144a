use async_trait::async_trait;
use carelink_application::{DisclosureNotification, NotificationDispatcher};
use carelink_core::AppResult;
use tracing::info;

/// Notification dispatcher that records consent events in the service log.
///
/// Delivery to end users happens outside the consent engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for TracingNotificationDispatcher {
    async fn dispatch(&self, notification: DisclosureNotification) -> AppResult<()> {
        info!(
            event = notification.event_name(),
            request_id = %notification.request_id(),
            recipient_id = notification.recipient_id(),
            "consent notification dispatched"
        );

        Ok(())
    }
}
