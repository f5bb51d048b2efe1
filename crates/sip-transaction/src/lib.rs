//! RFC 3261 §17 transaction layer for the sipstack-rs user-agent core
//! (spec.md §4.4 Transaction).
//!
//! Four pure, effect-returning state machines ([`client::ClientInviteTransaction`],
//! [`client::ClientNonInviteTransaction`], [`server::ServerInviteTransaction`],
//! [`server::ServerNonInviteTransaction`]) plus the [`manager::TransactionManager`]
//! that owns them, the shared [`timer::TimerQueue`], and the
//! [`rvoip_sip_transport::selector::TransportSelector`] they send through.
//! None of the state machines perform I/O directly — each `on_*` method
//! returns a `Vec<`[`effect::Effect`]`>` describing what the manager
//! should do, which keeps them trivially unit-testable with
//! `tokio::time::pause`/`advance` (see `timer.rs`'s tests).

pub mod client;
pub mod config;
pub mod effect;
pub mod error;
pub mod event;
pub mod key;
pub mod manager;
pub mod server;
pub mod timer;

pub mod prelude {
    pub use crate::client::{ClientInviteTransaction, ClientNonInviteTransaction};
    pub use crate::config::{StrayResponsePolicy, TimerSettings};
    pub use crate::effect::Effect;
    pub use crate::error::{Error, Result};
    pub use crate::event::TransactionEvent;
    pub use crate::key::TransactionKey;
    pub use crate::manager::TransactionManager;
    pub use crate::server::{ServerInviteTransaction, ServerNonInviteTransaction};
    pub use crate::timer::{TimerKind, TimerQueue};
}
