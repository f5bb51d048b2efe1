//! Transport selection and socket I/O for the sipstack-rs user-agent
//! core (spec.md §4.7 TransportSelector, §3 Transport).
//!
//! This crate owns the listener set (UDP/TCP today; TLS is named in
//! spec.md as a possible third variant but needs real crypto machinery
//! this core intentionally does not carry — see DESIGN.md), outbound
//! connection reuse, Via/Contact rewriting at send time, and the
//! inbound FIFO that the transaction layer drains from. DNS/URI
//! resolution is behind the pluggable [`resolver::Resolver`] trait,
//! per spec.md §1's "the core only requires that a resolver maps a URI
//! to an ordered list of candidate transports."

pub mod context;
pub mod error;
pub mod resolver;
pub mod selector;
pub mod tcp;
pub mod transport;
pub mod udp;

pub mod prelude {
    pub use crate::context::TransportContext;
    pub use crate::error::{Error, Result};
    pub use crate::resolver::{Resolver, SystemResolver};
    pub use crate::selector::TransportSelector;
    pub use crate::transport::{Transport, TransportKind};
}
