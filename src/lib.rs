//! socialgraph: relationship queries over a social graph.
//!
//! Users are stored with the list of ids they name as friends. The query
//! engine answers who lists a user, who those people list in turn, and
//! which of the latter share enough mutual friends to be worth suggesting.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod loader;
pub mod observability;
pub mod response;
pub mod types;
