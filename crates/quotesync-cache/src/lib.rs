// SQLite-backed key-value table
// Holds serialized blobs for whoever asks - quotes, filters, whatever

pub mod cache;

pub use cache::{CacheError, KvCache};
