//! Call session coordination for a chat client.
//!
//! A [`CallHandler`](calls::CallHandler) sits on the client's [`Dispatcher`](types::events::Dispatcher),
//! keeps at most one live call per room and tells the views whenever a
//! call's status changes. Media and signaling stay with the transport
//! library behind [`CallSession`](calls::CallSession).

pub mod calls;
pub mod config;
pub mod rooms;
pub mod ui;

pub mod types {
    pub mod call;
    pub mod events;
}

pub use calls::{Call, CallError, CallHandler};
pub use config::CallHandlerConfig;
pub use types::call::{CallStatus, RoomId};
pub use types::events::{Action, Dispatcher};

#[cfg(test)]
mod test_utils;
