//! Gateway configuration: the explicit startup value threaded into
//! component constructors, and the static services config file.

pub mod file;
pub mod gateway;

pub use file::*;
pub use gateway::GatewayConfig;
