//! Core domain types for the social graph.
//!
//! The on-disk and on-the-wire shape of a user follows the bulk-load JSON
//! format (`firstName`, `surname`, `gender`, `age`, `friends`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SocialGraphError};

// ---------------------------------------------------------------------------
// UserRecord
// ---------------------------------------------------------------------------

/// A single user in the social graph.
///
/// `friends` is kept exactly as loaded: it may repeat ids, reference users
/// that do not exist, or contain the record's own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(alias = "_id")]
    pub id: i64,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub friends: Vec<i64>,
}

impl UserRecord {
    /// Build a record with empty name fields. Handy for tests and fixtures.
    pub fn new(id: i64, friends: Vec<i64>) -> Self {
        Self {
            id,
            first_name: String::new(),
            surname: String::new(),
            gender: String::new(),
            age: None,
            friends,
        }
    }

    /// Whether this record lists `id` anywhere in its friends sequence.
    pub fn lists(&self, id: i64) -> bool {
        self.friends.contains(&id)
    }
}

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// A validated query subject.
///
/// Only non-zero identifiers can be constructed; zero is reserved for "no
/// identifier supplied". Negative values are accepted and simply never
/// match a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// The raw integer value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = SocialGraphError;

    fn try_from(value: i64) -> Result<Self> {
        if value == 0 {
            return Err(SocialGraphError::MissingIdentifier);
        }
        Ok(Self(value))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Subject
// ---------------------------------------------------------------------------

/// The outcome of validating an identifier token.
///
/// Identifiers have no upper bound, but stored ids are `i64`. A well-formed
/// integer beyond that range is still a valid subject; it just cannot name
/// any stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    Id(UserId),
    OutOfRange,
}

impl Subject {
    /// The storable identifier, if the subject has one.
    pub fn id(self) -> Option<UserId> {
        match self {
            Subject::Id(id) => Some(id),
            Subject::OutOfRange => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Id(id) => write!(f, "{id}"),
            Subject::OutOfRange => f.write_str("out-of-range"),
        }
    }
}

/// Validate an arbitrary input token as a query subject.
///
/// Surrounding whitespace is ignored. A token that is not an optionally
/// signed run of decimal digits fails with
/// [`SocialGraphError::InvalidIdentifier`]; one whose value is zero fails
/// with [`SocialGraphError::MissingIdentifier`]. Integers outside the `i64`
/// range become [`Subject::OutOfRange`].
pub fn parse_user_id(token: &str) -> Result<Subject> {
    let trimmed = token.trim();
    match trimmed.parse::<i64>() {
        Ok(value) => UserId::try_from(value).map(Subject::Id),
        Err(_) if is_integer_literal(trimmed) => Ok(Subject::OutOfRange),
        Err(_) => Err(SocialGraphError::InvalidIdentifier(token.to_string())),
    }
}

/// `[+-]?[0-9]+`
fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// QueryKind
// ---------------------------------------------------------------------------

/// The read operations the query engine exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Info,
    Friends,
    FriendsOfFriends,
    SuggestedFriends,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Friends => "friends",
            Self::FriendsOfFriends => "friends_of_friends",
            Self::SuggestedFriends => "suggested_friends",
        }
    }

    pub const ALL: [QueryKind; 4] = [
        Self::Info,
        Self::Friends,
        Self::FriendsOfFriends,
        Self::SuggestedFriends,
    ];
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1", 1 ; "plain positive")]
    #[test_case(" 42 ", 42 ; "surrounding whitespace")]
    #[test_case("+7", 7 ; "explicit plus sign")]
    #[test_case("-3", -3 ; "negative is accepted")]
    #[test_case("9223372036854775807", i64::MAX ; "no upper bound below i64 max")]
    fn parse_user_id_accepts(token: &str, expected: i64) {
        let subject = parse_user_id(token).unwrap();
        assert_eq!(subject.id().map(UserId::get), Some(expected));
    }

    #[test_case("99999999999999999999" ; "above i64 max")]
    #[test_case("-99999999999999999999" ; "below i64 min")]
    #[test_case(" +123456789012345678901234567890 " ; "padded and signed")]
    fn parse_user_id_accepts_out_of_range(token: &str) {
        assert_eq!(parse_user_id(token).unwrap(), Subject::OutOfRange);
    }

    #[test_case("abc" ; "letters")]
    #[test_case("" ; "empty")]
    #[test_case("1.5" ; "decimal")]
    #[test_case("12a" ; "trailing garbage")]
    #[test_case("99999999999999999999x" ; "long with trailing garbage")]
    #[test_case("+" ; "sign only")]
    #[test_case("--5" ; "double sign")]
    fn parse_user_id_rejects_invalid(token: &str) {
        let err = parse_user_id(token).unwrap_err();
        assert!(
            matches!(err, SocialGraphError::InvalidIdentifier(ref t) if t == token),
            "unexpected error: {err:?}"
        );
    }

    #[test_case("0" ; "zero")]
    #[test_case("-0" ; "negative zero")]
    #[test_case(" 0 " ; "padded zero")]
    #[test_case("00000000000000000000000" ; "long run of zeros")]
    fn parse_user_id_rejects_zero(token: &str) {
        assert!(matches!(
            parse_user_id(token),
            Err(SocialGraphError::MissingIdentifier)
        ));
    }

    #[test]
    fn subject_displays_its_identifier() {
        let subject = parse_user_id("10").unwrap();
        assert_eq!(subject, Subject::Id(UserId::try_from(10).unwrap()));
        assert_eq!(subject.to_string(), "10");
        assert_eq!(Subject::OutOfRange.id(), None);
    }

    #[test]
    fn user_id_try_from_zero_fails() {
        assert!(UserId::try_from(0).is_err());
        assert_eq!(UserId::try_from(5).unwrap().get(), 5);
    }

    #[test]
    fn record_deserializes_load_format() {
        let json = r#"{"id": 3, "firstName": "Ben", "surname": "O'Carolan",
                       "gender": "male", "age": null, "friends": [2, 4, 5, 7]}"#;
        let rec: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.id, 3);
        assert_eq!(rec.first_name, "Ben");
        assert_eq!(rec.surname, "O'Carolan");
        assert_eq!(rec.age, None);
        assert_eq!(rec.friends, vec![2, 4, 5, 7]);
    }

    #[test]
    fn record_accepts_underscore_id_alias() {
        let json = r#"{"_id": 9, "firstName": "Jack", "surname": "Stam",
                       "gender": "male", "age": 28, "friends": [12]}"#;
        let rec: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.id, 9);
        assert_eq!(rec.age, Some(28));
    }

    #[test]
    fn record_missing_optional_fields_use_defaults() {
        let rec: UserRecord = serde_json::from_str(r#"{"id": 4}"#).unwrap();
        assert_eq!(rec, UserRecord::new(4, vec![]));
    }

    #[test]
    fn record_serializes_with_public_keys() {
        let rec = UserRecord::new(1, vec![2]);
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["firstName"], "");
        assert!(value["age"].is_null());
        assert_eq!(value["friends"], serde_json::json!([2]));
    }

    #[test]
    fn record_lists_checks_membership() {
        let rec = UserRecord::new(1, vec![2, 1, 2]);
        assert!(rec.lists(1));
        assert!(rec.lists(2));
        assert!(!rec.lists(3));
    }

    #[test]
    fn query_kind_display_matches_serde_name() {
        for kind in QueryKind::ALL {
            assert_eq!(kind.to_string(), kind.as_str());
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::from(kind.as_str())
            );
        }
    }
}
