// # Config Store Implementations
//
// This module provides implementations of the ConfigStore trait for
// different persistence strategies, plus the typed `ProfileStore` that sits
// on top of them.

pub mod file;
pub mod memory;
pub mod profile_store;

pub use file::FileConfigStore;
pub use memory::MemoryConfigStore;
pub use profile_store::{AUTO_SWITCH_CONFIG_KEY, ProfileStore};
