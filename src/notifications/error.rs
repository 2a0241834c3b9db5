//! Notice delivery errors

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    /// Receivers that went away; they are unsubscribed
    #[error("{kind} notice not delivered to {}: receiver closed", .subscribers.join(", "))]
    Undelivered {
        kind: String,
        subscribers: Vec<String>,
    },

    #[error("Notice backlog of {queued} across {subscribers} subscribers exceeds the limit")]
    Backlog { queued: usize, subscribers: usize },
}

impl crate::core::error_handling::ContextualError for NotificationError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}
