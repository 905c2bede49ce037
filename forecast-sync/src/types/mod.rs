//! Domain types shared by the sync components.

mod checkpoint;
mod record;

pub use checkpoint::*;
pub use record::*;
