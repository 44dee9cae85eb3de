//! Core library: structured-list extractors, aggregate queries,
//! notification glue, and the vault facade over the remote file store.

pub mod config;
pub mod daily;
pub mod error;
pub mod memos;
pub mod models;
pub mod notify;
pub mod queries;
pub mod todos;
pub mod vault;
