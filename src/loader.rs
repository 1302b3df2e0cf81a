//! Bulk loading of user records from a JSON file.
//!
//! The input is a JSON array of user objects. Loading replaces the whole
//! dataset in one step; a file that fails validation leaves the store as
//! it was.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Result, SocialGraphError};
use crate::graph::store::{LoadMeta, RecordStore, SqliteStore};
use crate::types::UserRecord;

/// Outcome of a successful load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub inserted: usize,
    pub message: String,
    pub records: Vec<UserRecord>,
    /// Hex SHA-256 of the file contents.
    pub content_hash: String,
}

/// Read and validate a load file without touching any store.
pub fn read_records(path: &Path) -> Result<(Vec<UserRecord>, String)> {
    if path.as_os_str().is_empty() {
        return Err(SocialGraphError::LoadInput(
            "Specify a correct JSON data filename".into(),
        ));
    }
    if !path.is_file() {
        return Err(SocialGraphError::LoadInput(
            "Specify a correct JSON data filename and path".into(),
        ));
    }

    let bytes = std::fs::read(path)?;
    let content_hash = hex::encode(Sha256::digest(&bytes));
    let records: Vec<UserRecord> = serde_json::from_slice(&bytes).map_err(|e| {
        SocialGraphError::LoadInput(format!("Malformed JSON data in {}: {e}", path.display()))
    })?;
    Ok((records, content_hash))
}

/// Load `path` into any record store.
pub fn load_file(store: &dyn RecordStore, path: &Path) -> Result<LoadReport> {
    let (records, content_hash) = read_records(path)?;
    let inserted = store.replace_all(&records)?;
    Ok(report(inserted, records, content_hash))
}

/// Load `path` into a SQLite store, recording source, hash and time.
pub fn load_file_into_sqlite(store: &SqliteStore, path: &Path) -> Result<LoadReport> {
    let (records, content_hash) = read_records(path)?;
    let meta = LoadMeta {
        source_path: path.display().to_string(),
        content_hash: content_hash.clone(),
        user_count: records.len(),
        loaded_at: chrono::Utc::now().to_rfc3339(),
    };
    let inserted = store.replace_all_with_meta(&records, &meta)?;
    Ok(report(inserted, records, content_hash))
}

fn report(inserted: usize, records: Vec<UserRecord>, content_hash: String) -> LoadReport {
    tracing::info!("loaded {inserted} users (sha256 {content_hash})");
    LoadReport {
        inserted,
        message: format!("JSON file successfully loaded. Inserted {inserted} users"),
        records,
        content_hash,
    }
}
