//! Step loop and remote client surface for the user command manager.

pub mod config;
pub mod driver;
pub mod remote;

pub use config::{DrainPhase, DriverConfig, DriverConfigError};
pub use driver::StepDriver;
pub use remote::RemoteClient;
