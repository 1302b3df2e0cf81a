//! Row → domain type conversion.

use rusqlite::Row;

use crate::error::Result;
use crate::types::UserRecord;

/// Convert a `users` row into a [`UserRecord`].
///
/// The `friends` column holds the original JSON array; a value that fails
/// to parse surfaces as a [`crate::error::SocialGraphError::Json`].
pub fn row_to_user(row: &Row<'_>) -> Result<UserRecord> {
    let friends_json: String = row.get("friends")?;
    Ok(UserRecord {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        surname: row.get("surname")?,
        gender: row.get("gender")?,
        age: row.get("age")?,
        friends: serde_json::from_str(&friends_json)?,
    })
}
