//! Reserved group membership handling.
//!
//! Metabase manages two groups itself: every user is in "All Users" and every
//! superuser is in "Administrators". These never appear in a user's declared
//! `group_ids`; they are stripped when reading and re-added when writing.

use metabase_api::{GROUP_ADMINISTRATORS, GROUP_ALL_USERS, GroupMembership};

/// Group IDs managed by Metabase itself.
pub const RESERVED_GROUP_IDS: [i64; 2] = [GROUP_ALL_USERS, GROUP_ADMINISTRATORS];

/// Whether a group ID is reserved.
pub fn is_reserved(id: i64) -> bool {
    RESERVED_GROUP_IDS.contains(&id)
}

/// Remove reserved IDs, keeping order.
pub fn strip_reserved(ids: &[i64]) -> Vec<i64> {
    ids.iter().copied().filter(|id| !is_reserved(*id)).collect()
}

/// Add "All Users", and "Administrators" if `superuser`, each at most once.
pub fn add_reserved(ids: &[i64], superuser: bool) -> Vec<i64> {
    let mut out = Vec::with_capacity(ids.len() + 2);
    for &id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    if !out.contains(&GROUP_ALL_USERS) {
        out.push(GROUP_ALL_USERS);
    }
    if superuser && !out.contains(&GROUP_ADMINISTRATORS) {
        out.push(GROUP_ADMINISTRATORS);
    }
    out
}

/// Reconcile API membership order with the order already recorded in state.
///
/// IDs from `prior` that are still present remotely come first, in their
/// recorded order; any remaining remote IDs follow in API order. Reserved IDs
/// are always dropped.
pub fn ordered_group_ids(prior: Option<&[i64]>, remote: &[i64]) -> Vec<i64> {
    let mut ids: Vec<i64> = Vec::with_capacity(remote.len());
    for &id in prior.unwrap_or_default() {
        if remote.contains(&id) && !is_reserved(id) && !ids.contains(&id) {
            ids.push(id);
        }
    }
    for &id in remote {
        if !is_reserved(id) && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Membership objects for a list of group IDs.
pub fn to_memberships(ids: &[i64]) -> Vec<GroupMembership> {
    ids.iter().copied().map(GroupMembership::new).collect()
}
