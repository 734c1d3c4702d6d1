//! relayd - a minimal TCP reverse proxy
//!
//! This crate provides a small connection-dispatch core:
//! - An ordered backend registry fixed at startup
//! - Per-selection liveness probing (TCP connect with timeout)
//! - Round-robin or random backend selection with bounded retry
//! - Bidirectional byte forwarding with half-close semantics
//! - Graceful shutdown that drains in-flight sessions

pub mod backend;
pub mod config;
pub mod health;
pub mod listener;
pub mod proxy;
pub mod util;

pub use config::Config;
pub use listener::Listener;
