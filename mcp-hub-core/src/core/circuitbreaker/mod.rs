//! Per-client circuit breaking.
//! Each external client owns one breaker, driven only by the outcomes of its own calls.

mod breaker;
mod registry;
mod rule;

pub use breaker::*;
pub use registry::*;
pub use rule::*;
