//! # configurator-client
//!
//! Transport layer between the session runtime and the remote configuration
//! engine.
//!
//! The runtime depends only on [`EngineTransport`]. [`HttpTransport`] is the
//! production implementation; sessions are created and closed through a
//! pluggable [`SessionLifetime`] back-end.

pub mod classify;
pub mod error;
pub mod http;
pub mod lifetime;
pub mod traits;
pub mod wire;

pub use error::ClientError;
pub use http::{build_client, HttpTransport};
pub use lifetime::{ApiKeySessionLifetime, DelegatedSessionLifetime};
pub use traits::{EngineTransport, SessionLifetime, SetManyOutcome};
