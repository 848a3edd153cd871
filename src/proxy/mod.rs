//! Reverse proxy functionality
//!
//! Forwards a subtree of request targets to an external HTTP origin,
//! relaying the response body with chunked transfer coding.

pub mod upstream;

pub use upstream::ProxyHandler;
