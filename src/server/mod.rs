//! Connection dispatch.
//!
//! [`Server`] owns the listening socket and spawns one task per accepted
//! connection. What each connection answers is decided by a [`Handler`].

pub mod handler;
pub mod listener;

pub use handler::{Handler, HandlerError};
pub use listener::Server;
