//! Keeps a Postgres copy of the forecast table stored in Athena.
//!
//! Each invocation picks a sync mode from its trigger, reads the matching rows from Athena,
//! upserts them in batches within one transaction and appends the outcome to a sync log.

pub mod analytics;
pub mod checkpoint;
pub mod clients;
pub mod decoder;
pub mod destination;
pub mod error;
pub mod handler;
mod macros;
pub mod orchestrator;
pub mod resolver;
pub mod strategy;
pub mod trigger;
pub mod types;
pub mod writer;
