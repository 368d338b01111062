//! Storage layer for task and report persistence.

mod file;
mod traits;

pub use file::{FileStorage, DEFAULT_TAG};
pub use traits::{ReportLock, Storage};
