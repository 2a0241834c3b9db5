//! - `progress` - queue, start and finish of analyses
//! - `failures` - task failures and the base-scan cascade
//! - `cancel` - cancellation and last-successful rollback
//! - `waivers` - waiver submission, invalidation and deadlines
//! - `records` - creation, resubmission and chain integrity

mod cancel;
mod failures;
mod records;
mod waivers;
