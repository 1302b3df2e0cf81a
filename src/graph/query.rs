//! Friendship queries over a [`RecordStore`].
//!
//! "Friends of `u`" is structural: the records whose `friends` sequence
//! names `u`. The engine never reads `u`'s own list to decide who its
//! friends are, and it never assumes links are symmetric.

use std::collections::HashSet;

use crate::error::Result;
use crate::graph::store::{RecordReader, RecordStore};
use crate::types::{parse_user_id, QueryKind, UserId, UserRecord};

/// Minimum number of shared direct friends for a two-hop candidate to be
/// suggested.
pub const MIN_SHARED_FRIENDS: usize = 2;

// ---------------------------------------------------------------------------
// GraphQuery
// ---------------------------------------------------------------------------

/// Stateless query engine bound to a record store.
///
/// Holds nothing but a shared borrow, so any number of engines can run
/// against the same store at once. Queries that read more than once do so
/// through a [`RecordStore::snapshot`], so a concurrent reload never mixes
/// two datasets into one answer.
pub struct GraphQuery<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> GraphQuery<'a, S> {
    /// Create a new engine bound to the given store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Validate `token` and run the requested query.
    ///
    /// Validation happens before any store access.
    pub fn run(&self, kind: QueryKind, token: &str) -> Result<Vec<UserRecord>> {
        let subject = parse_user_id(token)?;
        let results = match subject.id() {
            Some(user) => match kind {
                QueryKind::Info => self.info(user),
                QueryKind::Friends => self.neighbors(user),
                QueryKind::FriendsOfFriends => self.neighbors_of_neighbors(user),
                QueryKind::SuggestedFriends => self.suggestions(user),
            }?,
            // Stored ids are i64, so an out-of-range subject matches nothing.
            None => Vec::new(),
        };
        tracing::debug!(
            query = %kind,
            user = %subject,
            results = results.len(),
            "query complete"
        );
        Ok(results)
    }

    // -------------------------------------------------------------------
    // info
    // -------------------------------------------------------------------

    /// The record for `user`, as a zero- or one-element list.
    pub fn info(&self, user: UserId) -> Result<Vec<UserRecord>> {
        Ok(self.store.find_by_id(user.get())?.into_iter().collect())
    }

    // -------------------------------------------------------------------
    // neighbors
    // -------------------------------------------------------------------

    /// Every record that lists `user` as a friend, excluding `user` itself.
    pub fn neighbors(&self, user: UserId) -> Result<Vec<UserRecord>> {
        direct_neighbors(self.store, user)
    }

    // -------------------------------------------------------------------
    // neighbors_of_neighbors
    // -------------------------------------------------------------------

    /// Records named by `user`'s direct friends that are neither `user` nor
    /// one of those direct friends.
    pub fn neighbors_of_neighbors(&self, user: UserId) -> Result<Vec<UserRecord>> {
        let view = self.store.snapshot()?;
        let direct = direct_neighbors(&*view, user)?;
        two_hop(&*view, user, &direct)
    }

    // -------------------------------------------------------------------
    // suggestions
    // -------------------------------------------------------------------

    /// Two-hop candidates sharing at least [`MIN_SHARED_FRIENDS`] direct
    /// friends with `user`.
    pub fn suggestions(&self, user: UserId) -> Result<Vec<UserRecord>> {
        let view = self.store.snapshot()?;
        let direct = direct_neighbors(&*view, user)?;
        let fof = two_hop(&*view, user, &direct)?;
        if fof.is_empty() {
            return Ok(Vec::new());
        }

        let direct_ids: HashSet<i64> = direct.iter().map(|f| f.id).collect();
        Ok(fof
            .into_iter()
            .filter(|candidate| shared_friends(&direct_ids, candidate) >= MIN_SHARED_FRIENDS)
            .collect())
    }
}

fn direct_neighbors<R: RecordReader + ?Sized>(
    reader: &R,
    user: UserId,
) -> Result<Vec<UserRecord>> {
    let id = user.get();
    let found = reader.find_where_friends_contains(id)?;
    Ok(dedup_by_id(found.into_iter().filter(|r| r.id != id)))
}

fn two_hop<R: RecordReader + ?Sized>(
    reader: &R,
    user: UserId,
    direct: &[UserRecord],
) -> Result<Vec<UserRecord>> {
    if direct.is_empty() {
        return Ok(Vec::new());
    }

    let candidates: HashSet<i64> = direct
        .iter()
        .flat_map(|f| f.friends.iter().copied())
        .collect();
    let mut excluded: HashSet<i64> = direct.iter().map(|f| f.id).collect();
    excluded.insert(user.get());

    if candidates.is_subset(&excluded) {
        return Ok(Vec::new());
    }

    let found = reader.find_by_ids(&candidates, &excluded)?;
    // Filter again so a store that ignores `exclude` cannot leak
    // excluded ids into the result.
    Ok(dedup_by_id(
        found
            .into_iter()
            .filter(|r| candidates.contains(&r.id) && !excluded.contains(&r.id)),
    ))
}

/// Number of distinct ids in `candidate.friends` that are also in
/// `direct_ids`.
pub fn shared_friends(direct_ids: &HashSet<i64>, candidate: &UserRecord) -> usize {
    candidate
        .friends
        .iter()
        .filter(|id| direct_ids.contains(*id))
        .collect::<HashSet<_>>()
        .len()
}

/// Keep the first record seen for each id, preserving order.
fn dedup_by_id(records: impl IntoIterator<Item = UserRecord>) -> Vec<UserRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
