//! TCP forwarding between client and backend.

mod forward;

pub use forward::{ForwardError, ProxyResult, connect_to_backend, copy_bidirectional, forward};
