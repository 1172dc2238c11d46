//! Serial bridge services
//!
//! The connection manager owns the device link; the broadcaster fans its
//! events out to push-channel subscribers; the gateway turns dashboard
//! operations into device commands.

mod broadcaster;
mod connection_manager;
mod gateway;

#[cfg(test)]
pub(crate) mod test_support;

pub use broadcaster::{Broadcaster, SubscriberId, Subscription};
pub use connection_manager::{ConnectionManager, SequencedEvent, SerialSettings};
pub use gateway::CommandGateway;
