//! Graph layer: record stores and the friendship query engine.

pub mod query;
pub mod store;
