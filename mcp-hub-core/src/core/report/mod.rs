mod service;
mod ticker;
mod trend;

pub use service::*;
pub use ticker::*;
pub use trend::*;
