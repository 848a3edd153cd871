//! rawhttp - HTTP/1.1 over raw TCP
//!
//! An incremental request parser, an order-enforcing response writer and a
//! one-task-per-connection server, with no HTTP stack underneath.

pub mod config;
pub mod http;
pub mod proxy;
pub mod routes;
pub mod server;
