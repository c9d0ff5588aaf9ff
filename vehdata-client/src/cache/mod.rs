//! Cache tiers shared by every registry adapter

mod durable;
mod entry;
mod layered;
mod memory;

pub use durable::{DurableStore, SqliteStore};
pub use entry::CacheEntry;
pub use layered::{CachePolicy, LayeredCache};
pub use memory::MemoryCache;
