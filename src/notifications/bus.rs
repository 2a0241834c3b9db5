//! Message bus adapter
//!
//! Implements the lifecycle's notification port on top of the in-process
//! notification manager. Anything that wants to forward state notices to an
//! external bus or mail gateway subscribes to the manager.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::notifications::error::NotificationError;
use crate::notifications::event::{Event, StateNotice};
use crate::notifications::manager::AsyncNotificationManager;
use crate::scan::ports::NotificationPort;

#[derive(Clone)]
pub struct BusNotifier {
    manager: Arc<Mutex<AsyncNotificationManager>>,
}

impl BusNotifier {
    pub fn new(manager: Arc<Mutex<AsyncNotificationManager>>) -> Self {
        Self { manager }
    }

    /// Notifier with its own private manager
    pub fn standalone() -> Self {
        Self::new(Arc::new(Mutex::new(AsyncNotificationManager::new())))
    }

    pub fn manager(&self) -> Arc<Mutex<AsyncNotificationManager>> {
        self.manager.clone()
    }
}

#[async_trait]
impl NotificationPort for BusNotifier {
    async fn publish(&self, notice: StateNotice) -> Result<(), NotificationError> {
        log::debug!(
            "Publishing {} notice ({}) for scan {}",
            notice.state,
            notice.class,
            notice.scan_id
        );
        let mut manager = self.manager.lock().await;
        manager.publish(Event::State(notice)).await
    }
}
