//! Data source abstraction.
//!
//! This module defines the contract a cache uses to fetch a complete
//! snapshot, plus small in-process sources.

mod func;
mod memory;
mod traits;

pub use func::FnSource;
pub use memory::MemorySource;
pub use traits::SnapshotSource;
