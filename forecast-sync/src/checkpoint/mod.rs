//! Append-only log of sync runs.

mod base;
pub mod memory;
pub mod postgres;
mod tracker;

pub use base::*;
pub use tracker::*;
