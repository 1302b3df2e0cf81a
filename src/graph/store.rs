//! Record stores for the social graph.
//!
//! [`RecordReader`] is the narrow read contract the query engine goes
//! through, and [`RecordStore`] adds bulk replacement and pinned read
//! views. [`SqliteStore`] is the persistent implementation; [`MemoryStore`]
//! keeps an immutable map behind an `RwLock` and is what tests and
//! embedders reach for when no database file is wanted.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::db::converters::row_to_user;
use crate::db::schema::initialize_database;
use crate::error::{Result, SocialGraphError};
use crate::types::UserRecord;

// ---------------------------------------------------------------------------
// StoreStats / LoadMeta
// ---------------------------------------------------------------------------

/// Aggregate statistics about the stored graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub users: usize,
    /// Number of entries across all `friends` sequences, duplicates included.
    pub friendships: usize,
}

/// Provenance of the most recent bulk load.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoadMeta {
    pub source_path: String,
    pub content_hash: String,
    pub user_count: usize,
    pub loaded_at: String,
}

// ---------------------------------------------------------------------------
// RecordReader / RecordStore
// ---------------------------------------------------------------------------

/// Read access to user records.
pub trait RecordReader {
    /// Point lookup by id.
    fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>>;

    /// Every record whose `friends` sequence contains `id`.
    fn find_where_friends_contains(&self, id: i64) -> Result<Vec<UserRecord>>;

    /// Every record whose id is in `include` and not in `exclude`.
    fn find_by_ids(&self, include: &HashSet<i64>, exclude: &HashSet<i64>)
        -> Result<Vec<UserRecord>>;

    fn stats(&self) -> Result<StoreStats>;
}

impl<T: RecordReader + ?Sized> RecordReader for &T {
    fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        (**self).find_by_id(id)
    }

    fn find_where_friends_contains(&self, id: i64) -> Result<Vec<UserRecord>> {
        (**self).find_where_friends_contains(id)
    }

    fn find_by_ids(
        &self,
        include: &HashSet<i64>,
        exclude: &HashSet<i64>,
    ) -> Result<Vec<UserRecord>> {
        (**self).find_by_ids(include, exclude)
    }

    fn stats(&self) -> Result<StoreStats> {
        (**self).stats()
    }
}

/// A record source that can be replaced wholesale.
///
/// Each read method sees either the dataset before or after a
/// [`replace_all`](RecordStore::replace_all), never a mix of both. Separate
/// calls are separate reads, though: a reload may land between them. A
/// caller that combines several reads into one answer takes a
/// [`snapshot`](RecordStore::snapshot) and reads through that instead.
pub trait RecordStore: RecordReader {
    /// Atomically replace the whole dataset. Returns the number of records
    /// inserted. Fails without touching existing data if two records share
    /// an id.
    fn replace_all(&self, records: &[UserRecord]) -> Result<usize>;

    /// A read view pinned to the dataset current at the time of the call.
    /// Replacements made after it is taken are not visible through it.
    fn snapshot(&self) -> Result<Box<dyn RecordReader + '_>>;
}

/// Reject datasets with repeated ids before any write happens.
fn check_unique_ids(records: &[UserRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            return Err(SocialGraphError::LoadInput(format!(
                "Duplicate user id {} in input",
                record.id
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

/// Columns every user query selects, in the order [`row_to_user`] expects.
macro_rules! select_users {
    ($($tail:literal),+) => {
        concat!(
            "SELECT id, first_name, surname, gender, age, friends\nFROM users\n",
            $($tail),+
        )
    };
}

const INSERT_USER_SQL: &str = "\
INSERT INTO users (id, first_name, surname, gender, age, friends)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const INSERT_FRIENDSHIP_SQL: &str = "\
INSERT INTO friendships (user_id, position, friend_id)
VALUES (?1, ?2, ?3)";

const FIND_BY_ID_SQL: &str = select_users!("WHERE id = ?1");

const FIND_WHERE_FRIENDS_CONTAINS_SQL: &str = select_users!(
    "WHERE id IN (SELECT user_id FROM friendships WHERE friend_id = ?1)\n",
    "ORDER BY id ASC"
);

// Both id sets travel as JSON arrays and are expanded with json_each, so
// the include/exclude filter stays a single statement regardless of size.
const FIND_BY_IDS_SQL: &str = select_users!(
    "WHERE id IN (SELECT value FROM json_each(?1))\n",
    "  AND id NOT IN (SELECT value FROM json_each(?2))\n",
    "ORDER BY id ASC"
);

const UPSERT_LOAD_META_SQL: &str = "\
INSERT INTO load_meta (id, source_path, content_hash, user_count, loaded_at)
VALUES (1, ?1, ?2, ?3, ?4)
ON CONFLICT(id) DO UPDATE SET
  source_path = excluded.source_path,
  content_hash = excluded.content_hash,
  user_count = excluded.user_count,
  loaded_at = excluded.loaded_at";

const SELECT_LOAD_META_SQL: &str = "\
SELECT source_path, content_hash, user_count, loaded_at FROM load_meta WHERE id = 1";

// ---------------------------------------------------------------------------
// SQLite reads
// ---------------------------------------------------------------------------

// Shared by the store and its snapshots; a `Transaction` derefs to the
// `Connection` it runs on.

fn query_users<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<UserRecord>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_and_then(params, row_to_user)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
}

fn sqlite_find_by_id(conn: &Connection, id: i64) -> Result<Option<UserRecord>> {
    let mut stmt = conn.prepare_cached(FIND_BY_ID_SQL)?;
    let mut rows = stmt.query_and_then(params![id], row_to_user)?;
    rows.next().transpose()
}

fn sqlite_find_by_ids(
    conn: &Connection,
    include: &HashSet<i64>,
    exclude: &HashSet<i64>,
) -> Result<Vec<UserRecord>> {
    if include.is_empty() {
        return Ok(Vec::new());
    }
    let include_json = serde_json::to_string(include)?;
    let exclude_json = serde_json::to_string(exclude)?;
    query_users(conn, FIND_BY_IDS_SQL, params![include_json, exclude_json])
}

fn sqlite_stats(conn: &Connection) -> Result<StoreStats> {
    // Reading as usize rejects a negative count instead of wrapping it.
    let users: usize = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    let friendships: usize =
        conn.query_row("SELECT COUNT(*) FROM friendships", [], |row| row.get(0))?;
    Ok(StoreStats { users, friendships })
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

/// SQLite-backed record store.
///
/// Queries go through [`Connection::prepare_cached`], so each statement is
/// compiled once per connection. The connection is not `Sync`; share a
/// store across threads behind a `Mutex`.
pub struct SqliteStore {
    pub conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and apply the schema.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = initialize_database(db_path).map_err(|e| {
            tracing::warn!("could not open record store at {db_path}: {e}");
            SocialGraphError::StoreUnavailable(format!("{db_path}: {e}"))
        })?;
        tracing::debug!("opened record store at {db_path}");
        Ok(Self { conn })
    }

    /// A private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Replace the dataset and record where it came from, in one
    /// transaction.
    pub fn replace_all_with_meta(&self, records: &[UserRecord], meta: &LoadMeta) -> Result<usize> {
        check_unique_ids(records)?;
        let tx = self.conn.unchecked_transaction()?;
        let inserted = Self::write_records(&tx, records)?;
        tx.prepare_cached(UPSERT_LOAD_META_SQL)?.execute(params![
            meta.source_path,
            meta.content_hash,
            meta.user_count,
            meta.loaded_at,
        ])?;
        tx.commit()?;
        tracing::info!(
            "replaced dataset with {inserted} users from {}",
            meta.source_path
        );
        Ok(inserted)
    }

    /// Provenance of the last load, if any load went through
    /// [`replace_all_with_meta`](Self::replace_all_with_meta).
    pub fn last_load(&self) -> Result<Option<LoadMeta>> {
        let mut stmt = self.conn.prepare_cached(SELECT_LOAD_META_SQL)?;
        let meta = stmt
            .query_row([], |row| {
                Ok(LoadMeta {
                    source_path: row.get(0)?,
                    content_hash: row.get(1)?,
                    user_count: row.get(2)?,
                    loaded_at: row.get(3)?,
                })
            })
            .optional()?;
        Ok(meta)
    }

    /// Clear both tables and insert `records`. Caller owns the transaction.
    fn write_records(conn: &Connection, records: &[UserRecord]) -> Result<usize> {
        conn.execute("DELETE FROM friendships", [])?;
        conn.execute("DELETE FROM users", [])?;
        {
            let mut user_stmt = conn.prepare_cached(INSERT_USER_SQL)?;
            let mut link_stmt = conn.prepare_cached(INSERT_FRIENDSHIP_SQL)?;
            for record in records {
                user_stmt.execute(params![
                    record.id,
                    record.first_name,
                    record.surname,
                    record.gender,
                    record.age,
                    serde_json::to_string(&record.friends)?,
                ])?;
                for (position, friend_id) in record.friends.iter().enumerate() {
                    link_stmt.execute(params![record.id, position, friend_id])?;
                }
            }
        }
        Ok(records.len())
    }
}

impl RecordReader for SqliteStore {
    fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        sqlite_find_by_id(&self.conn, id)
    }

    fn find_where_friends_contains(&self, id: i64) -> Result<Vec<UserRecord>> {
        query_users(&self.conn, FIND_WHERE_FRIENDS_CONTAINS_SQL, params![id])
    }

    fn find_by_ids(
        &self,
        include: &HashSet<i64>,
        exclude: &HashSet<i64>,
    ) -> Result<Vec<UserRecord>> {
        sqlite_find_by_ids(&self.conn, include, exclude)
    }

    fn stats(&self) -> Result<StoreStats> {
        sqlite_stats(&self.conn)
    }
}

impl RecordStore for SqliteStore {
    fn replace_all(&self, records: &[UserRecord]) -> Result<usize> {
        check_unique_ids(records)?;
        let tx = self.conn.unchecked_transaction()?;
        let inserted = Self::write_records(&tx, records)?;
        tx.commit()?;
        tracing::info!("replaced dataset with {inserted} users");
        Ok(inserted)
    }

    fn snapshot(&self) -> Result<Box<dyn RecordReader + '_>> {
        let tx = self.conn.unchecked_transaction()?;
        // A deferred transaction only pins its snapshot at the first read.
        tx.query_row("SELECT COUNT(*) FROM load_meta", [], |row| row.get::<_, i64>(0))?;
        Ok(Box::new(SqliteSnapshot { tx }))
    }
}

/// Read transaction over a [`SqliteStore`]. Rolled back on drop.
struct SqliteSnapshot<'conn> {
    tx: Transaction<'conn>,
}

impl RecordReader for SqliteSnapshot<'_> {
    fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        sqlite_find_by_id(&self.tx, id)
    }

    fn find_where_friends_contains(&self, id: i64) -> Result<Vec<UserRecord>> {
        query_users(&self.tx, FIND_WHERE_FRIENDS_CONTAINS_SQL, params![id])
    }

    fn find_by_ids(
        &self,
        include: &HashSet<i64>,
        exclude: &HashSet<i64>,
    ) -> Result<Vec<UserRecord>> {
        sqlite_find_by_ids(&self.tx, include, exclude)
    }

    fn stats(&self) -> Result<StoreStats> {
        sqlite_stats(&self.tx)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

type RecordMap = BTreeMap<i64, UserRecord>;

/// In-memory record store keyed by id.
///
/// The map itself is never mutated. `replace_all` swaps in a new one under
/// the write lock, and readers hold their own `Arc` to whichever map was
/// current when they started.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Arc<RecordMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `records`.
    pub fn with_records(records: &[UserRecord]) -> Result<Self> {
        let store = Self::new();
        store.replace_all(records)?;
        Ok(store)
    }

    fn current(&self) -> Result<MemorySnapshot> {
        let guard = self
            .records
            .read()
            .map_err(|_| SocialGraphError::StoreUnavailable("memory store lock poisoned".into()))?;
        Ok(MemorySnapshot(Arc::clone(&guard)))
    }
}

impl RecordReader for MemoryStore {
    fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        self.current()?.find_by_id(id)
    }

    fn find_where_friends_contains(&self, id: i64) -> Result<Vec<UserRecord>> {
        self.current()?.find_where_friends_contains(id)
    }

    fn find_by_ids(
        &self,
        include: &HashSet<i64>,
        exclude: &HashSet<i64>,
    ) -> Result<Vec<UserRecord>> {
        self.current()?.find_by_ids(include, exclude)
    }

    fn stats(&self) -> Result<StoreStats> {
        self.current()?.stats()
    }
}

impl RecordStore for MemoryStore {
    fn replace_all(&self, records: &[UserRecord]) -> Result<usize> {
        check_unique_ids(records)?;
        let next: RecordMap = records.iter().map(|r| (r.id, r.clone())).collect();
        let mut guard = self
            .records
            .write()
            .map_err(|_| SocialGraphError::StoreUnavailable("memory store lock poisoned".into()))?;
        *guard = Arc::new(next);
        tracing::debug!("memory store now holds {} users", guard.len());
        Ok(records.len())
    }

    fn snapshot(&self) -> Result<Box<dyn RecordReader + '_>> {
        Ok(Box::new(self.current()?))
    }
}

/// One generation of a [`MemoryStore`]'s map.
struct MemorySnapshot(Arc<RecordMap>);

impl RecordReader for MemorySnapshot {
    fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        Ok(self.0.get(&id).cloned())
    }

    fn find_where_friends_contains(&self, id: i64) -> Result<Vec<UserRecord>> {
        Ok(self.0.values().filter(|r| r.lists(id)).cloned().collect())
    }

    fn find_by_ids(
        &self,
        include: &HashSet<i64>,
        exclude: &HashSet<i64>,
    ) -> Result<Vec<UserRecord>> {
        let mut ids: Vec<i64> = include.difference(exclude).copied().collect();
        ids.sort_unstable();
        Ok(ids.iter().filter_map(|id| self.0.get(id).cloned()).collect())
    }

    fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            users: self.0.len(),
            friendships: self.0.values().map(|r| r.friends.len()).sum(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
