// Core quote logic - storage, merging, syncing
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod merge;
pub mod models;
pub mod remote;
pub mod storage;
pub mod store;
pub mod sync;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, StorageBackend};
pub use error::{Error, ValidationError};
pub use export::{ExportFormat, Exporter};
pub use merge::{MergePolicy, MergeReport};
pub use models::{CategoryFilter, Quote};
pub use remote::{HttpRemoteFetcher, RemoteFetcher};
pub use storage::{JsonFileStorage, MemoryStorage, SqliteStorage, Storage};
pub use store::QuoteStore;
pub use sync::{SyncEvent, SyncReport, SyncService};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
