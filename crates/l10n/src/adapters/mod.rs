//! Reference collaborators.
//!
//! Enough to run the service without a platform integration: an in-process
//! locale subsystem, an in-memory table store, and a loader reading TOML
//! tables from a directory tree.

mod dir;
mod memory;
mod selector;

pub use dir::DirTableLoader;
pub use memory::MemoryTableLoader;
pub use selector::LocaleSelector;
