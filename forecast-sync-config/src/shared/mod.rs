mod athena;
mod base;
mod batch;
mod sync;
mod target;

pub use athena::*;
pub use base::*;
pub use batch::*;
pub use sync::*;
pub use target::*;
