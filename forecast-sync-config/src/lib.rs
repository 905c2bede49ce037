//! Configuration for the forecast sync service.
//!
//! Provides environment detection, layered configuration loading from YAML files and `APP_`
//! environment variables, secret handling and the shared configuration types consumed by the
//! sync engine and its runner.

mod environment;
mod load;
mod secret;
pub mod shared;

pub use environment::*;
pub use load::*;
pub use secret::*;
