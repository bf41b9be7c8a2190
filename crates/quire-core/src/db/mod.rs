//! Database layer for Quire

mod connection;
mod document_repository;
mod migrations;

pub use connection::Database;
pub use document_repository::{LibSqlLocalStore, LibSqlRemoteStore};
