pub mod types;
pub mod arbitrator;

pub use types::*;
pub use arbitrator::*;
