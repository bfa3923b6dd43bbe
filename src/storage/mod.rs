pub mod memory;

pub use memory::{CacheMetadata, CatalogCache};
