//! Error reporting shared by every error type in the crate

/// Errors that know whether the user can act on them
///
/// When `is_user_actionable()` is true, `user_message()` must return the
/// message to show. Otherwise it returns `None` and the caller shows its own
/// operation context instead.
pub trait ContextualError: std::error::Error {
    /// True for problems the user fixes (bad settings, unknown scan id, illegal event)
    fn is_user_actionable(&self) -> bool;

    fn user_message(&self) -> Option<&str>;
}

/// Log a fatal error at the level of detail it deserves
///
/// User-actionable errors log their own message; anything else logs
/// `operation_context`. Full details always go to debug level.
///
/// # Examples
/// ```rust,no_run
/// # use scanhub::core::error_handling::log_error_with_context;
/// # use scanhub::scan::api::{LifecycleError, ScanId};
/// let err = LifecycleError::NotFound { scan_id: ScanId(42) };
/// log_error_with_context(&err, "Canceling scan");
/// // Logs: "FATAL: Unknown scan id"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(message) if error.is_user_actionable() => log::error!("FATAL: {}", message),
        _ => log::error!("FATAL: {}", operation_context),
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
