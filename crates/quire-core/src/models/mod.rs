//! Data models for Quire

mod conflict;
mod document;

pub use conflict::{Conflict, ResolutionKind, ResolvedConflict};
pub use document::{
    DocumentFields, DocumentId, DocumentSnapshot, Field, FieldValue, MergeFn, Origin, Revision,
};
