//! Inode table and tree bookkeeping for the mounted namespace.

use std::collections::BTreeMap;
use std::time::UNIX_EPOCH;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::fs::entry::{EntryKind, WikiEntry};
use crate::fs::{FsError, Inode, ROOT_INO};

/// Reported to the kernel and used for block accounting.
pub(crate) const BLOCK_SIZE: u32 = 4096;

/// Every known entry, keyed by inode, plus the mount-wide constants.
pub(crate) struct Registry {
    entries: FxHashMap<Inode, WikiEntry>,
    /// Namespace segments every remote id is prefixed with.
    chroot: Vec<String>,
    /// uid and gid reported for every entry.
    owner: (u32, u32),
}

impl Registry {
    pub(crate) fn new(chroot: &str, owner: (u32, u32)) -> Self {
        let chroot = chroot
            .split(':')
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect();
        let mut entries = FxHashMap::default();
        entries.insert(ROOT_INO, WikiEntry::root());
        Self {
            entries,
            chroot,
            owner,
        }
    }

    // ── Inode allocation ──────────────────────────────────────────────

    /// Pick an unused inode. u32 draws keep us clear of the kernel's
    /// reserved range while collisions stay vanishingly rare.
    fn allocate_inode(&self) -> Inode {
        loop {
            let candidate = Inode::from(rand::random::<u32>());
            if candidate > ROOT_INO && !self.entries.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Add `entry` to the table, assigning an inode if it has none yet.
    pub(crate) fn register(&mut self, mut entry: WikiEntry) -> Inode {
        if entry.ino == 0 {
            entry.ino = self.allocate_inode();
        }
        let ino = entry.ino;
        debug_assert!(
            !self.entries.contains_key(&ino),
            "inode {ino} registered twice"
        );
        trace!(ino, name = %entry.name, "registering entry");
        self.entries.insert(ino, entry);
        ino
    }

    pub(crate) fn unregister(&mut self, ino: Inode) -> Option<WikiEntry> {
        trace!(ino, "unregistering entry");
        self.entries.remove(&ino)
    }

    /// Drop `ino` and everything reachable below it.
    pub(crate) fn remove_subtree(&mut self, ino: Inode) {
        if let Some(entry) = self.entries.remove(&ino)
            && let EntryKind::Directory {
                children: Some(children),
            } = entry.kind
        {
            for child in children.into_values() {
                self.remove_subtree(child);
            }
        }
    }

    // ── Resolution ────────────────────────────────────────────────────

    pub(crate) fn resolve(&self, ino: Inode) -> Result<&WikiEntry, FsError> {
        self.entries.get(&ino).ok_or(FsError::NotFound)
    }

    pub(crate) fn resolve_mut(&mut self, ino: Inode) -> Result<&mut WikiEntry, FsError> {
        self.entries.get_mut(&ino).ok_or(FsError::NotFound)
    }

    pub(crate) fn resolve_dir(&self, ino: Inode) -> Result<&WikiEntry, FsError> {
        let entry = self.resolve(ino)?;
        match entry.kind {
            EntryKind::Directory { .. } => Ok(entry),
            _ => Err(FsError::NotADirectory),
        }
    }

    pub(crate) fn resolve_dir_mut(&mut self, ino: Inode) -> Result<&mut WikiEntry, FsError> {
        let entry = self.resolve_mut(ino)?;
        match entry.kind {
            EntryKind::Directory { .. } => Ok(entry),
            _ => Err(FsError::NotADirectory),
        }
    }

    // ── Child maps ────────────────────────────────────────────────────

    /// Look a visible filename up in a directory's child map.
    pub(crate) fn child_of(&self, dir: Inode, file_name: &str) -> Result<Inode, FsError> {
        let entry = self.resolve_dir(dir)?;
        let EntryKind::Directory { children } = &entry.kind else {
            return Err(FsError::NotADirectory);
        };
        debug_assert!(children.is_some(), "child lookup in unpopulated dir {dir}");
        children
            .as_ref()
            .and_then(|map| map.get(file_name).copied())
            .ok_or(FsError::NotFound)
    }

    pub(crate) fn bind_child(
        &mut self,
        dir: Inode,
        file_name: String,
        child: Inode,
    ) -> Result<(), FsError> {
        let entry = self.resolve_dir_mut(dir)?;
        let EntryKind::Directory { children } = &mut entry.kind else {
            return Err(FsError::NotADirectory);
        };
        children
            .get_or_insert_with(BTreeMap::new)
            .insert(file_name, child);
        Ok(())
    }

    pub(crate) fn remove_child(&mut self, dir: Inode, file_name: &str) -> Result<Inode, FsError> {
        let entry = self.resolve_dir_mut(dir)?;
        let EntryKind::Directory { children } = &mut entry.kind else {
            return Err(FsError::NotADirectory);
        };
        children
            .as_mut()
            .and_then(|map| map.remove(file_name))
            .ok_or(FsError::NotFound)
    }

    // ── Paths ─────────────────────────────────────────────────────────

    /// Bare segments from the root down to `ino`, chroot excluded.
    pub(crate) fn path_segments(&self, ino: Inode) -> Result<Vec<String>, FsError> {
        let mut segments = Vec::new();
        let mut cursor = ino;
        while cursor != ROOT_INO {
            let entry = self.resolve(cursor)?;
            segments.push(entry.name.clone());
            cursor = entry.parent.unwrap_or(ROOT_INO);
        }
        segments.reverse();
        Ok(segments)
    }

    /// Colon-delimited remote id for `ino`, chroot included.
    pub(crate) fn remote_id(&self, ino: Inode) -> Result<String, FsError> {
        let mut parts = self.chroot.clone();
        parts.extend(self.path_segments(ino)?);
        Ok(parts.join(":"))
    }

    /// How many namespace levels sit above `ino`'s children.
    pub(crate) fn depth(&self, ino: Inode) -> Result<u32, FsError> {
        let segments = self.path_segments(ino)?;
        Ok((self.chroot.len() + segments.len()) as u32)
    }

    // ── Attributes ────────────────────────────────────────────────────

    pub(crate) fn attr(&self, ino: Inode) -> Result<fuser::FileAttr, FsError> {
        Ok(self.attr_of(self.resolve(ino)?))
    }

    pub(crate) fn attr_of(&self, entry: &WikiEntry) -> fuser::FileAttr {
        let size = entry.size();
        let (perm, nlink) = match entry.kind {
            EntryKind::Directory { .. } => (0o755, 2),
            _ => (0o644, 1),
        };
        fuser::FileAttr {
            ino: entry.ino,
            size,
            blocks: size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: entry.atime,
            mtime: entry.mtime,
            ctime: entry.ctime,
            crtime: UNIX_EPOCH,
            kind: entry.file_type(),
            perm,
            nlink,
            uid: self.owner.0,
            gid: self.owner.1,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Registry {
        Registry::new("", (1000, 1000))
    }

    #[test]
    fn allocated_inodes_are_unique_and_above_root() {
        let mut reg = fresh();
        let mut seen = std::collections::HashSet::new();
        for i in 0..256 {
            let ino = reg.register(WikiEntry::new_page(format!("p{i}"), ROOT_INO));
            assert!(ino > ROOT_INO, "{ino} collides with the reserved range");
            assert!(seen.insert(ino), "{ino} handed out twice");
        }
    }

    #[test]
    fn preassigned_inodes_are_kept() {
        let mut reg = fresh();
        let mut entry = WikiEntry::new_page("pinned", ROOT_INO);
        entry.ino = 4242;
        assert_eq!(reg.register(entry), 4242);
        assert!(reg.resolve(4242).is_ok());
    }

    #[test]
    fn resolving_an_unknown_inode_fails() {
        let reg = fresh();
        assert!(matches!(reg.resolve(9999), Err(FsError::NotFound)));
    }

    #[test]
    fn leaves_refuse_directory_resolution() {
        let mut reg = fresh();
        let ino = reg.register(WikiEntry::new_page("notes", ROOT_INO));
        assert!(matches!(reg.resolve_dir(ino), Err(FsError::NotADirectory)));
    }

    #[test]
    fn child_bindings_round_trip() {
        let mut reg = fresh();
        let ino = reg.register(WikiEntry::new_page("notes", ROOT_INO));
        reg.bind_child(ROOT_INO, "notes.doku".to_owned(), ino)
            .expect("root is a directory");
        assert_eq!(reg.child_of(ROOT_INO, "notes.doku").expect("bound"), ino);
        assert_eq!(reg.remove_child(ROOT_INO, "notes.doku").expect("bound"), ino);
        assert!(matches!(
            reg.child_of(ROOT_INO, "notes.doku"),
            Err(FsError::NotFound)
        ));
    }

    #[test]
    fn subtree_removal_reaches_grandchildren() {
        let mut reg = fresh();
        let dir = reg.register(WikiEntry::empty_directory("proj", ROOT_INO));
        let leaf = reg.register(WikiEntry::new_page("design", dir));
        reg.bind_child(ROOT_INO, "proj".to_owned(), dir)
            .expect("root is a directory");
        reg.bind_child(dir, "design.doku".to_owned(), leaf)
            .expect("proj is a directory");

        reg.remove_subtree(dir);
        assert!(reg.resolve(dir).is_err());
        assert!(reg.resolve(leaf).is_err());
        assert_eq!(reg.entry_count(), 1, "only the root should remain");
    }

    #[test]
    fn remote_ids_join_segments_with_colons() {
        let mut reg = fresh();
        let dir = reg.register(WikiEntry::empty_directory("proj", ROOT_INO));
        let leaf = reg.register(WikiEntry::new_page("design", dir));
        assert_eq!(reg.remote_id(ROOT_INO).expect("root resolves"), "");
        assert_eq!(reg.remote_id(dir).expect("dir resolves"), "proj");
        assert_eq!(reg.remote_id(leaf).expect("leaf resolves"), "proj:design");
    }

    #[test]
    fn chroot_prefixes_ids_and_depth() {
        let mut reg = Registry::new("team", (0, 0));
        let dir = reg.register(WikiEntry::empty_directory("proj", ROOT_INO));
        assert_eq!(reg.remote_id(ROOT_INO).expect("root resolves"), "team");
        assert_eq!(reg.remote_id(dir).expect("dir resolves"), "team:proj");
        assert_eq!(reg.depth(ROOT_INO).expect("root resolves"), 1);
        assert_eq!(reg.depth(dir).expect("dir resolves"), 2);
    }

    #[test]
    fn empty_chroot_keeps_depth_at_zero() {
        let reg = fresh();
        assert_eq!(reg.depth(ROOT_INO).expect("root resolves"), 0);
    }

    #[test]
    fn attrs_report_modes_and_block_counts() {
        let mut reg = fresh();
        let dir = reg.register(WikiEntry::empty_directory("proj", ROOT_INO));
        let leaf = reg.register(WikiEntry::page_from_listing("design", ROOT_INO, 7, 5000));

        let dir_attr = reg.attr(dir).expect("dir resolves");
        assert_eq!(dir_attr.perm, 0o755);
        assert_eq!(dir_attr.nlink, 2);
        assert_eq!(dir_attr.kind, fuser::FileType::Directory);

        let leaf_attr = reg.attr(leaf).expect("leaf resolves");
        assert_eq!(leaf_attr.perm, 0o644);
        assert_eq!(leaf_attr.size, 5000);
        assert_eq!(leaf_attr.blocks, 2, "5000 bytes span two 4096 blocks");
        assert_eq!(leaf_attr.uid, 1000);
    }
}
