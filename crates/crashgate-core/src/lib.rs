//! Core types shared across all Crashgate crates

pub mod event;
pub mod queue;

// Re-export commonly used types
pub use event::*;
pub use queue::*;

// Re-export external dependencies
pub use async_trait;
pub use serde_json;
pub use tokio_util;
