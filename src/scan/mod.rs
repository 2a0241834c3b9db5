//! Scan Lifecycle
//!
//! State machine and orchestration for static-analysis scans: every scan
//! record moves through its states only via the [`LifecycleManager`]
//! entry points, which persist the change, publish a state notice and
//! propagate failures or cancellations to related scans.
//!
//! ## Layout
//!
//! - **types**: scan records, states and the state sets
//! - **machine**: pure transition rules
//! - **cascade**: failure and cancel propagation, last-successful rollback
//! - **overdue**: waiver deadline checks
//! - **ports**: collaborator traits (storage, task queue, bus, results, settings)
//! - **manager**: the entry points
//! - **memory**: in-memory port adapters and JSON fixtures

pub mod api;
pub mod cascade;
pub mod error;
pub mod machine;
pub mod manager;
pub mod memory;
pub mod overdue;
pub mod ports;
pub mod query;
pub mod types;

pub use error::{LifecycleError, LifecycleResult};
pub use manager::{EventOutcome, LifecycleManager, LifecyclePorts};
