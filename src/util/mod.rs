//! Utility functions and helpers.

mod logging;
mod session;
mod shutdown;

pub use logging::init_logging;
pub use session::SessionId;
pub use shutdown::{ShutdownSignal, wait_for_signal};
