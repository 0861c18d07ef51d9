pub mod config;
pub mod metadata;
pub mod sync;

pub use metadata::{FileRecord, MetadataError, MetadataStore, SyncState};
pub use sync::engine::{EngineError, SyncEngine, SyncReport};
pub use sync::remote::{RemoteError, RemoteNode, RemoteTree};
