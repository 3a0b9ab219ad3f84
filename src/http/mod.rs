//! HTTP server module for the deploy webhook listener
//!
//! The server exposes a single endpoint:
//! - POST /webhook/deploy - signed GitHub push webhooks
//!
//! Every other method or path gets a JSON 404 without any signature check.

pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod server;

pub use server::start_server;
