//! quire-core - Core library for Quire
//!
//! Document models, the local and remote document stores, and the sync
//! engine that reconciles the two. Used by the `quire` CLI and by any
//! embedder that brings its own store implementations.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;
pub mod sync;

pub use config::{ConfigError, SyncConfig};
pub use error::{Error, Result};
pub use models::{
    Conflict, DocumentFields, DocumentId, DocumentSnapshot, Field, FieldValue, Origin,
    ResolutionKind, ResolvedConflict, Revision,
};
pub use store::{LocalStore, RemoteStore};
pub use sync::{
    PreferSide, ResolutionProvider, SyncError, SyncOrchestrator, SyncProgress, SyncResult,
};
