//! The application-facing crate of the sipstack-rs user-agent core
//! (spec.md §5 "Concurrency & Resource Model", §6 "External Interfaces").
//!
//! [`executive::Executive`] is the single-threaded cooperative scheduler:
//! it owns the `rvoip-sip-transaction` [`rvoip_sip_transaction::manager::TransactionManager`],
//! the `rvoip-sip-dialog` [`rvoip_sip_dialog::registry::DialogRegistry`],
//! and the shared `rvoip-sip-transport` [`rvoip_sip_transport::selector::TransportSelector`],
//! and re-expresses spec.md §6's `buildFdSet`/`process`/`getTimeTillNextProcess`
//! Application API as a `tokio::select!` loop. [`tuim::TuIM`] is a
//! buddy-list/instant-message convenience layer built on top of it,
//! grounded on the original `TuIM` (SPEC_FULL.md §4 "Supplemented
//! features").
//!
//! [`config::StackConfig`] and [`pidf::Pidf`] round out the ambient
//! stack: construction-time settings, and a minimal PIDF presence body
//! good enough to drive SUBSCRIBE/NOTIFY end-to-end.

pub mod config;
pub mod error;
pub mod executive;
pub mod pidf;
pub mod tuim;

pub mod prelude {
    pub use crate::config::{StackConfig, StrayResponsePolicy};
    pub use crate::error::{Error, Result};
    pub use crate::executive::Executive;
    pub use crate::pidf::Pidf;
    pub use crate::tuim::{SignatureStatus, TuIM, TuImCallbacks};
}
