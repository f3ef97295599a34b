//! # configurator-session
//!
//! Session orchestration and reconciliation for the configurator SDK.
//!
//! A session keeps a local mirror of one remote configuration session:
//!
//! - [`merge()`] folds the engine's partial responses into a full configuration
//! - [`decisions`] extracts the caller's explicit decisions for replay
//! - [`SessionLifecycle`] creates, re-creates and closes remote sessions
//! - [`SessionCore`] owns the snapshot and executes operations
//! - [`ExclusiveSession`], [`CoalescingSession`] and [`RetryingSession`]
//!   wrap the core to serialize, coalesce and retry operations
//!
//! Use [`SessionBuilder`] to get a fully composed session.

pub mod builder;
pub mod coalesce;
pub mod decisions;
pub mod exclusive;
pub mod lifecycle;
pub mod merge;
pub mod retry;
pub mod session;
pub mod traits;

#[cfg(test)]
mod testing;

pub use builder::SessionBuilder;
pub use coalesce::{CoalescingSession, ReducingQueue};
pub use decisions::{
    explicit_decisions, has_explicit_decisions, StoredConfiguration, StoredConfigurationError,
};
pub use exclusive::{ExclusiveScope, ExclusiveSession};
pub use lifecycle::SessionLifecycle;
pub use merge::merge;
pub use retry::RetryingSession;
pub use session::SessionCore;
pub use traits::{ConfigurationChangedHandler, ConfigurationSession, SetManyResult};
