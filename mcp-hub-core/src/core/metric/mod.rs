mod aggregator;
mod health;
mod histogram;
mod snapshot;

pub use aggregator::*;
pub use health::*;
pub use histogram::*;
pub use snapshot::*;
