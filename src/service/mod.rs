//! Service layer: the broadcast dispatcher.
//!
//! [`Dispatcher`] drives each connection's state machine, mutates the
//! [`super::domain::ConnectionRegistry`] and hands messages to the
//! [`super::persistence::PersistenceQueue`].

pub mod dispatcher;

pub use dispatcher::{BroadcastReport, Dispatcher, EventOutcome, IgnoreReason};
