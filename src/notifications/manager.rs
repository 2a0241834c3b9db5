//! AsyncNotificationManager implementation

use crate::notifications::error::NotificationError;
use crate::notifications::event::{Event, EventFilter};
use crate::notifications::traits::SubscriberStatistics;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

// Auto-management thresholds
const HIGH_WATER_MARK: usize = 10000; // Queue size threshold for concern
const STALE_SUBSCRIBER_TIMEOUT: Duration = Duration::from_secs(300); // 5 minutes without consuming
const MEMORY_EXHAUSTION_THRESHOLD: usize = 1_000_000;

struct SubscriberInfo {
    filter: EventFilter,
    source: String,
    sender: UnboundedSender<Event>,
    statistics: Arc<SubscriberStatistics>,
}

/// Receiving end of a subscription; keeps the subscriber statistics current
pub struct EventReceiver {
    receiver: UnboundedReceiver<Event>,
    statistics: Arc<SubscriberStatistics>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<Event> {
        let event = self.receiver.recv().await?;
        self.statistics.decrement_queue_size();
        self.statistics.record_message_processed();
        Some(event)
    }

    /// Non-blocking receive, `None` when nothing is queued
    pub fn try_recv(&mut self) -> Option<Event> {
        let event = self.receiver.try_recv().ok()?;
        self.statistics.decrement_queue_size();
        self.statistics.record_message_processed();
        Some(event)
    }
}

pub struct AsyncNotificationManager {
    subscribers: HashMap<String, SubscriberInfo>,
}

impl Default for AsyncNotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncNotificationManager {
    pub fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
        }
    }

    pub fn subscribe(
        &mut self,
        subscriber_id: String,
        filter: EventFilter,
        source: String,
    ) -> EventReceiver {
        let (sender, receiver) = unbounded_channel();
        let statistics = Arc::new(SubscriberStatistics::new());

        let subscriber_info = SubscriberInfo {
            filter,
            source: source.clone(),
            sender,
            statistics: statistics.clone(),
        };

        // Warn if overwriting existing subscriber
        if let Some(existing) = self
            .subscribers
            .insert(subscriber_id.clone(), subscriber_info)
        {
            log::warn!(
                "Subscriber '{}' replaced existing subscription (source: {} -> {})",
                subscriber_id,
                existing.source,
                source
            );
        }

        EventReceiver {
            receiver,
            statistics,
        }
    }

    pub fn unsubscribe(&mut self, subscriber_id: &str) -> bool {
        self.subscribers.remove(subscriber_id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn has_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers.contains_key(subscriber_id)
    }

    pub fn get_subscriber_statistics(&self, subscriber_id: &str) -> Option<&SubscriberStatistics> {
        self.subscribers
            .get(subscriber_id)
            .map(|info| info.statistics.as_ref())
    }

    // Subscribers sitting on a full queue they stopped draining
    fn stale_subscribers(&self) -> Vec<String> {
        let now = Instant::now();
        self.subscribers
            .iter()
            .filter(|(_, info)| info.statistics.queue_size() >= HIGH_WATER_MARK)
            .filter(|(_, info)| match info.statistics.last_message_time() {
                Some(last) => now.duration_since(last) > STALE_SUBSCRIBER_TIMEOUT,
                None => true,
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn drop_stale_subscribers(&mut self) -> Vec<String> {
        let stale = self.stale_subscribers();
        for subscriber_id in &stale {
            log::warn!("Dropping stale subscriber '{}'", subscriber_id);
            self.subscribers.remove(subscriber_id);
        }
        stale
    }

    pub fn check_memory_exhaustion(&self) -> Result<(), NotificationError> {
        let queue_sizes: Vec<(String, usize)> = self
            .subscribers
            .iter()
            .map(|(id, info)| (id.clone(), info.statistics.queue_size()))
            .collect();

        let total_events: usize = queue_sizes.iter().map(|(_, size)| *size).sum();

        if total_events > MEMORY_EXHAUSTION_THRESHOLD {
            return Err(NotificationError::Backlog {
                queued: total_events,
                subscribers: queue_sizes.len(),
            });
        }

        Ok(())
    }

    pub async fn publish(&mut self, event: Event) -> Result<(), NotificationError> {
        self.drop_stale_subscribers();
        self.check_memory_exhaustion()?;

        let mut failed_subscribers = Vec::new();
        let event_type = event.kind().to_string();

        for (subscriber_id, subscriber_info) in &self.subscribers {
            if subscriber_info.filter.accepts(&event) {
                subscriber_info.statistics.increment_queue_size();

                if subscriber_info.sender.send(event.clone()).is_err() {
                    // Channel is closed, mark for removal
                    subscriber_info.statistics.decrement_queue_size();
                    failed_subscribers.push(subscriber_id.clone());
                }
            }
        }

        // Remove subscribers with closed channels
        for subscriber_id in &failed_subscribers {
            self.subscribers.remove(subscriber_id);
        }

        if !failed_subscribers.is_empty() {
            return Err(NotificationError::Undelivered {
                kind: event_type,
                subscribers: failed_subscribers,
            });
        }

        Ok(())
    }
}
