//! Tracing setup for the forecast sync service.
//!
//! Production-like environments emit JSON lines on stderr, which function runtimes
//! forward to their log sink. Development emits pretty, colored output. Stdout stays reserved
//! for the invocation response.

pub mod tracing;
