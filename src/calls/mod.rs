//! Call session coordination for rooms.
//!
//! The transport library owns the real call sessions; this module keeps at
//! most one live call per room, turns transport state changes into the coarse
//! UI status views render, and announces every change on the [`Dispatcher`].
//!
//! # Architecture
//!
//! - [`CallSession`] / [`CallFactory`]: seam to the signaling library
//! - [`derive_status`]: ordered cascade from transport transitions to [`CallStatus`]
//! - [`CallRegistry`] & [`Call`]: the room -> call mapping views query
//! - [`CallHandler`]: consumes `place_call`, `incoming_call`, `hangup` and
//!   `answer`, publishes `call_state` and `view_room`
//! - [`loopback`]: in-process transport with a scripted peer
//!
//! [`Dispatcher`]: crate::types::events::Dispatcher
//! [`CallStatus`]: crate::types::call::CallStatus

mod error;
mod handler;
pub mod loopback;
mod registry;
mod state;
mod transport;

pub use error::CallError;
pub use handler::{CallHandler, CallHandlerBuilder};
pub use registry::{Call, CallRegistry};
pub use state::{Derivation, Effect, Transition, derive_status};
pub use transport::{CallEvent, CallEventListener, CallFactory, CallSession, MediaSink};
