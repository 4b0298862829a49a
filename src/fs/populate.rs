//! Building directory child maps from remote namespace listings.

use std::collections::BTreeMap;

use tracing::{debug, instrument, trace, warn};

use crate::fs::api::{ContentApi, RemoteItem};
use crate::fs::entry::{EntryKind, WikiEntry};
use crate::fs::registry::Registry;
use crate::fs::{FsError, Inode};

/// Which remote result set a listing row came from.
#[derive(Debug, Clone, Copy)]
enum Listing {
    Documents,
    Attachments,
}

/// Populate `dir` unless its child map is already loaded.
pub(crate) fn ensure_populated<A: ContentApi>(
    reg: &mut Registry,
    api: &A,
    dir: Inode,
) -> Result<(), FsError> {
    if let EntryKind::Directory { children: Some(_) } = &reg.resolve_dir(dir)?.kind {
        return Ok(());
    }
    populate(reg, api, dir)
}

/// Rebuild `dir`'s child map from fresh remote listings.
///
/// Both listings are fetched before any state changes, so a fault leaves
/// the map exactly as it was. The fresh map replaces the old one
/// wholesale; children no longer listed are unregistered with their
/// subtrees.
#[instrument(skip(reg, api))]
pub(crate) fn populate<A: ContentApi>(
    reg: &mut Registry,
    api: &A,
    dir: Inode,
) -> Result<(), FsError> {
    reg.resolve_dir(dir)?;
    let namespace = reg.remote_id(dir)?;
    let depth = reg.depth(dir)?;

    // One level for the children themselves, one more so grandchildren
    // reveal which names are directories.
    let documents = api.list_documents(&namespace, depth + 2)?;
    let attachments = api.list_attachments(&namespace, depth + 2)?;

    let mut fresh = BTreeMap::new();
    for item in &documents {
        insert_item(reg, &mut fresh, dir, depth as usize, item, Listing::Documents);
    }
    for item in &attachments {
        insert_item(reg, &mut fresh, dir, depth as usize, item, Listing::Attachments);
    }
    debug!(
        namespace = %namespace,
        documents = documents.len(),
        attachments = attachments.len(),
        children = fresh.len(),
        "populated directory"
    );

    let EntryKind::Directory { children } = &mut reg.resolve_dir_mut(dir)?.kind else {
        unreachable!("resolve_dir_mut returned a leaf");
    };
    let stale = children.replace(fresh);
    if let Some(stale) = stale {
        for ino in stale.into_values() {
            reg.remove_subtree(ino);
        }
    }
    Ok(())
}

/// Fold one listing row into the child map under construction.
fn insert_item(
    reg: &mut Registry,
    fresh: &mut BTreeMap<String, Inode>,
    dir: Inode,
    depth: usize,
    item: &RemoteItem,
    listing: Listing,
) {
    let segments: Vec<&str> = item.id.split(':').collect();
    if segments.len() <= depth {
        trace!(id = %item.id, "listing row does not reach below this directory, skipping");
        return;
    }
    let rest = &segments[depth..];

    if rest.len() > 1 {
        // A deeper id implies an intermediate namespace directory.
        let dir_name = rest[0];
        if dir_name.is_empty() || fresh.contains_key(dir_name) {
            return;
        }
        let ino = reg.register(WikiEntry::directory(dir_name, dir));
        fresh.insert(dir_name.to_owned(), ino);
        return;
    }

    let name = rest[0];
    if name.is_empty() {
        trace!(id = %item.id, "listing row has an empty leaf name, skipping");
        return;
    }
    let entry = match listing {
        Listing::Documents => WikiEntry::page_from_listing(name, dir, item.mtime, item.size),
        Listing::Attachments => {
            WikiEntry::attachment_from_listing(name, dir, item.mtime, item.size)
        }
    };
    let file_name = entry.filename();
    if fresh.contains_key(&file_name) {
        warn!(id = %item.id, file_name, "duplicate visible filename, keeping the first");
        return;
    }
    let ino = reg.register(entry);
    fresh.insert(file_name, ino);
}
