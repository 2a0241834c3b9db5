//! Public API for the notification system
//!
//! External modules should import from here rather than directly from
//! internal modules.

use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;

pub use crate::notifications::bus::BusNotifier;
pub use crate::notifications::error::NotificationError;
pub use crate::notifications::event::{
    Event, EventFilter, StateNotice, SystemEvent, SystemEventType,
};
pub use crate::notifications::manager::{AsyncNotificationManager, EventReceiver};
pub use crate::notifications::traits::SubscriberStatistics;

/// Global notification service instance
static NOTIFICATION_SERVICE: LazyLock<Arc<Mutex<AsyncNotificationManager>>> = LazyLock::new(|| {
    log::trace!("Initializing notification service");
    Arc::new(Mutex::new(AsyncNotificationManager::new()))
});

/// Access notification service
///
/// Returns a guard over the process-wide notification manager. Each call
/// locks the same shared instance.
///
/// # Examples
/// ```no_run
/// # use scanhub::notifications::api::{get_notification_service, Event, SystemEvent, SystemEventType};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut manager = get_notification_service().await;
/// let event = Event::System(SystemEvent::new(SystemEventType::Startup));
/// manager.publish(event).await?;
/// # Ok(())
/// # }
/// ```
pub async fn get_notification_service() -> tokio::sync::MutexGuard<'static, AsyncNotificationManager>
{
    log::trace!("Acquiring notification service lock");
    NOTIFICATION_SERVICE.lock().await
}

/// Notifier publishing into the process-wide notification service
pub fn global_notifier() -> BusNotifier {
    BusNotifier::new(NOTIFICATION_SERVICE.clone())
}
