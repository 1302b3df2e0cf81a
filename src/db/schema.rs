//! SQLite schema initialization for the social graph store.
//!
//! Users live in one table with their `friends` sequence kept verbatim as a
//! JSON array. A separate `friendships` table indexes each (user, friend)
//! link so "who lists me" lookups hit an index instead of scanning JSON.

use rusqlite::Connection;

// ---------------------------------------------------------------------------
// DDL constants
// ---------------------------------------------------------------------------

const CREATE_USERS: &str = "\
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY,
  first_name TEXT NOT NULL DEFAULT '',
  surname TEXT NOT NULL DEFAULT '',
  gender TEXT NOT NULL DEFAULT '',
  age INTEGER,
  friends TEXT NOT NULL DEFAULT '[]'
)";

const CREATE_FRIENDSHIPS: &str = "\
CREATE TABLE IF NOT EXISTS friendships (
  user_id INTEGER NOT NULL,
  position INTEGER NOT NULL,
  friend_id INTEGER NOT NULL,
  PRIMARY KEY (user_id, position),
  FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
)";

const CREATE_LOAD_META: &str = "\
CREATE TABLE IF NOT EXISTS load_meta (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  source_path TEXT NOT NULL,
  content_hash TEXT NOT NULL,
  user_count INTEGER NOT NULL,
  loaded_at TEXT NOT NULL
)";

// Indexes ----------------------------------------------------------------

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_friendships_friend ON friendships(friend_id)",
    "CREATE INDEX IF NOT EXISTS idx_friendships_user ON friendships(user_id)",
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Open (or create) the SQLite database at `db_path` and apply the schema.
///
/// The returned connection has WAL mode, foreign keys, and synchronous
/// NORMAL already configured. `":memory:"` opens a private in-memory
/// database.
///
/// # Errors
///
/// Returns a `rusqlite::Error` if the database cannot be opened or any DDL
/// statement fails.
pub fn initialize_database(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    apply_schema(&conn)?;
    Ok(conn)
}

/// Apply pragmas, tables and indexes to an already-open connection.
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    // -- Pragmas ----------------------------------------------------------
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    // -- Core tables ------------------------------------------------------
    conn.execute_batch(CREATE_USERS)?;
    conn.execute_batch(CREATE_FRIENDSHIPS)?;
    conn.execute_batch(CREATE_LOAD_META)?;

    // -- Indexes ----------------------------------------------------------
    for ddl in CREATE_INDEXES {
        conn.execute_batch(ddl)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        initialize_database(":memory:").expect("schema init should succeed on :memory:")
    }

    fn object_exists(conn: &Connection, obj_type: &str, obj_name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
            [obj_type, obj_name],
            |row| row.get::<_, i64>(0),
        )
        .map(|c| c > 0)
        .unwrap_or(false)
    }

    fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn schema_creation_succeeds() {
        let _conn = setup();
    }

    #[test]
    fn core_tables_exist() {
        let conn = setup();
        for table in ["users", "friendships", "load_meta"] {
            assert!(object_exists(&conn, "table", table), "missing table {table}");
        }
    }

    #[test]
    fn indexes_exist() {
        let conn = setup();
        assert!(object_exists(&conn, "index", "idx_friendships_friend"));
        assert!(object_exists(&conn, "index", "idx_friendships_user"));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = setup();
        apply_schema(&conn).expect("second application should be a no-op");
    }

    #[test]
    fn pragmas_are_set() {
        let conn = setup();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
        let sync: i64 = conn
            .query_row("PRAGMA synchronous", [], |row| row.get(0))
            .unwrap();
        // NORMAL = 1
        assert_eq!(sync, 1);
    }

    #[test]
    fn users_table_has_expected_columns() {
        let conn = setup();
        assert_eq!(
            column_names(&conn, "users"),
            vec!["id", "first_name", "surname", "gender", "age", "friends"]
        );
    }

    #[test]
    fn friendships_table_has_expected_columns() {
        let conn = setup();
        assert_eq!(
            column_names(&conn, "friendships"),
            vec!["user_id", "position", "friend_id"]
        );
    }

    #[test]
    fn user_defaults_apply() {
        let conn = setup();
        conn.execute("INSERT INTO users (id) VALUES (1)", []).unwrap();
        let (name, friends, age): (String, String, Option<i64>) = conn
            .query_row(
                "SELECT first_name, friends, age FROM users WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(name, "");
        assert_eq!(friends, "[]");
        assert_eq!(age, None);
    }

    #[test]
    fn users_primary_key_prevents_duplicates() {
        let conn = setup();
        conn.execute("INSERT INTO users (id) VALUES (1)", []).unwrap();
        assert!(conn.execute("INSERT INTO users (id) VALUES (1)", []).is_err());
    }

    #[test]
    fn deleting_user_cascades_to_friendships() {
        let conn = setup();
        conn.execute("INSERT INTO users (id) VALUES (1)", []).unwrap();
        conn.execute(
            "INSERT INTO friendships (user_id, position, friend_id) VALUES (1, 0, 2)",
            [],
        )
        .unwrap();
        conn.execute("DELETE FROM users WHERE id = 1", []).unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM friendships", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn load_meta_holds_a_single_row() {
        let conn = setup();
        conn.execute(
            "INSERT INTO load_meta (id, source_path, content_hash, user_count, loaded_at) \
             VALUES (1, 'a.json', 'h', 3, 'now')",
            [],
        )
        .unwrap();
        assert!(conn
            .execute(
                "INSERT INTO load_meta (id, source_path, content_hash, user_count, loaded_at) \
                 VALUES (2, 'b.json', 'h', 3, 'now')",
                [],
            )
            .is_err());
    }
}
