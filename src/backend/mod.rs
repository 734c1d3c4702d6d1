//! Backend registry and selection.

mod registry;
mod selector;
pub mod strategy;

pub use registry::{BackendEndpoint, BackendRegistry};
pub use selector::Selector;
