//! Foundation utilities: math types and logging
//!
//! These are the low-level building blocks shared by every engine module.

pub mod logging;
pub mod math;
