//! Query submission against the analytical engine.
//!
//! [`QueryEngine`] is the narrow boundary to the remote service, [`AthenaQueryEngine`] its
//! production implementation and [`QueryExecutor`] the bounded submit, poll and fetch loop on top.

mod athena;
mod base;
mod executor;
#[cfg(test)]
pub(crate) mod test_engine;

pub use athena::*;
pub use base::*;
pub use executor::*;
