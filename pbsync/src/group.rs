//! Target group lookup-or-create
//!
//! The lookup itself is a pure function over a snapshot of group rows so it
//! can be exercised against in-memory fixtures; the resolver wires it to
//! the store's scan and insert. At most one group per title is ever treated
//! as the target: the first visible, non-deleted match wins and any
//! duplicates already in the store are ignored.

use crate::error::{ImportError, Result};
use pbsync_store::{ContactStore, GroupId, GroupRow, NewGroup};
use tracing::info;

/// Find a group by title in a snapshot of visible, non-deleted rows.
/// First match wins; row order is store-defined.
pub fn find_group(rows: &[GroupRow], title: &str) -> Option<GroupId> {
    rows.iter().find(|row| row.title == title).map(|row| row.id)
}

/// Return the id of the group titled `title`, creating it if absent.
///
/// Performs a fresh scan on every call (no caching); callers should
/// resolve once per run and reuse the id. The created group reuses the
/// title as both account name and account type — imported groups are not
/// tied to any real external account.
pub async fn resolve_or_create_group<S: ContactStore>(store: &S, title: &str) -> Result<GroupId> {
    if let Some(id) = find_group(&store.group_rows().await?, title) {
        return Ok(id);
    }

    info!(group = title, "Creating contact group");
    store
        .insert_group(&NewGroup {
            title: title.to_string(),
            visible: true,
            account_name: Some(title.to_string()),
            account_type: Some(title.to_string()),
        })
        .await?;

    // The insert must yield a discoverable group on re-scan; anything else
    // is store inconsistency.
    find_group(&store.group_rows().await?, title).ok_or_else(|| ImportError::GroupCreation {
        title: title.to_string(),
    })
}
