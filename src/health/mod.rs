//! Liveness probing for backend endpoints.

mod prober;

pub use prober::{Probe, TcpProber};
