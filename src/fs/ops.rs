//! Filesystem verbs over the mounted wiki namespace.

use parking_lot::Mutex;
use tracing::{debug, instrument, trace, warn};

use crate::fs::api::ContentApi;
use crate::fs::entry::{EntryKind, NameClass, WikiEntry};
use crate::fs::populate::ensure_populated;
use crate::fs::registry::{BLOCK_SIZE, Registry};
use crate::fs::{FsError, Inode, ROOT_INO};

/// One directory listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRow {
    pub ino: Inode,
    pub name: String,
    pub kind: fuser::FileType,
}

/// Static filesystem figures for `statfs`.
#[derive(Debug, Clone, Copy)]
pub struct FsStats {
    pub block_size: u32,
    pub total_inodes: u64,
    pub max_filename_length: u32,
}

/// The whole mounted tree plus the remote API it mirrors.
///
/// Every verb takes the registry lock for its full duration, remote
/// calls included, so population and mutation stay atomic with respect
/// to concurrent lookups.
pub struct WikiFs<A> {
    api: A,
    registry: Mutex<Registry>,
}

impl<A: ContentApi> WikiFs<A> {
    pub fn new(api: A, chroot: &str, owner: (u32, u32)) -> Self {
        Self {
            api,
            registry: Mutex::new(Registry::new(chroot, owner)),
        }
    }

    // ── Resolution verbs ──────────────────────────────────────────────

    #[instrument(skip(self))]
    pub fn lookup(&self, parent: Inode, name: &str) -> Result<fuser::FileAttr, FsError> {
        let mut reg = self.registry.lock();
        if name == "." {
            return reg.attr(parent);
        }
        if name == ".." {
            // The namespace is flat on the wire; dot-dot always lands
            // on the mount root.
            return reg.attr(ROOT_INO);
        }
        if name.starts_with('.') {
            trace!(name, "hiding dotfile");
            return Err(FsError::NotFound);
        }
        ensure_populated(&mut reg, &self.api, parent)?;
        let child = reg.child_of(parent, name)?;
        reg.attr(child)
    }

    #[instrument(skip(self))]
    pub fn getattr(&self, ino: Inode) -> Result<fuser::FileAttr, FsError> {
        self.registry.lock().attr(ino)
    }

    #[instrument(skip(self))]
    pub fn setattr(&self, ino: Inode, size: Option<u64>) -> Result<fuser::FileAttr, FsError> {
        let mut reg = self.registry.lock();
        if let Some(size) = size {
            // Resizes stay local; the next write pushes the buffer out.
            self.ensure_content(&mut reg, ino)?;
            let target = usize::try_from(size).map_err(|_| FsError::TooLarge)?;
            let entry = reg.resolve_mut(ino)?;
            let mut bytes = entry
                .cached_content()
                .unwrap_or_else(|| unreachable!("content ensured above"))
                .to_vec();
            bytes.resize(target, 0);
            entry.set_content(bytes);
        }
        reg.attr(ino)
    }

    #[instrument(skip(self))]
    pub fn access(&self, ino: Inode) -> Result<(), FsError> {
        self.registry.lock().resolve(ino).map(|_| ())
    }

    // ── Directory verbs ───────────────────────────────────────────────

    #[instrument(skip(self))]
    pub fn opendir(&self, ino: Inode) -> Result<(), FsError> {
        self.registry.lock().resolve_dir(ino).map(|_| ())
    }

    #[instrument(skip(self))]
    pub fn readdir(&self, dir: Inode) -> Result<Vec<DirRow>, FsError> {
        let mut reg = self.registry.lock();
        ensure_populated(&mut reg, &self.api, dir)?;
        let entry = reg.resolve_dir(dir)?;
        // The root is its own parent.
        let parent = entry.parent.unwrap_or(dir);
        let EntryKind::Directory {
            children: Some(children),
        } = &entry.kind
        else {
            unreachable!("populated directory lost its child map");
        };
        let mut rows = Vec::with_capacity(children.len() + 2);
        rows.push(DirRow {
            ino: dir,
            name: ".".to_owned(),
            kind: fuser::FileType::Directory,
        });
        rows.push(DirRow {
            ino: parent,
            name: "..".to_owned(),
            kind: fuser::FileType::Directory,
        });
        for (name, ino) in children {
            match reg.resolve(*ino) {
                Ok(child) => rows.push(DirRow {
                    ino: *ino,
                    name: name.clone(),
                    kind: child.file_type(),
                }),
                Err(_) => warn!(ino = *ino, name = %name, "child map references a missing inode"),
            }
        }
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub fn mkdir(&self, parent: Inode, name: &str) -> Result<fuser::FileAttr, FsError> {
        let mut reg = self.registry.lock();
        ensure_populated(&mut reg, &self.api, parent)?;
        if reg.child_of(parent, name).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        // A directory is only a namespace prefix; nothing exists
        // remotely until a leaf is created beneath it.
        let ino = reg.register(WikiEntry::empty_directory(name, parent));
        reg.bind_child(parent, name.to_owned(), ino)?;
        debug!(parent, name, ino, "created directory");
        reg.attr(ino)
    }

    #[instrument(skip(self))]
    pub fn rmdir(&self, parent: Inode, name: &str) -> Result<(), FsError> {
        let mut reg = self.registry.lock();
        ensure_populated(&mut reg, &self.api, parent)?;
        let child = reg.child_of(parent, name)?;
        reg.resolve_dir(child)?;
        // Prove emptiness against the remote listing, not just the cache.
        ensure_populated(&mut reg, &self.api, child)?;
        let EntryKind::Directory {
            children: Some(children),
        } = &reg.resolve_dir(child)?.kind
        else {
            unreachable!("populated directory lost its child map");
        };
        if !children.is_empty() {
            return Err(FsError::NotEmpty);
        }
        reg.remove_child(parent, name)?;
        reg.unregister(child);
        debug!(parent, name, "removed directory");
        Ok(())
    }

    // ── Leaf verbs ────────────────────────────────────────────────────

    #[instrument(skip(self))]
    pub fn open(&self, ino: Inode) -> Result<(), FsError> {
        let reg = self.registry.lock();
        match reg.resolve(ino)?.kind {
            EntryKind::Directory { .. } => Err(FsError::IsADirectory),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self))]
    pub fn read(&self, ino: Inode, offset: u64, size: u32) -> Result<Vec<u8>, FsError> {
        let mut reg = self.registry.lock();
        self.ensure_content(&mut reg, ino)?;
        let entry = reg.resolve_mut(ino)?;
        entry.touch_accessed();
        let bytes = entry
            .cached_content()
            .unwrap_or_else(|| unreachable!("content ensured above"));
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
        let end = start.saturating_add(size as usize).min(bytes.len());
        Ok(bytes[start..end].to_vec())
    }

    #[instrument(skip(self, data))]
    pub fn write(&self, ino: Inode, offset: u64, data: &[u8]) -> Result<u32, FsError> {
        let mut reg = self.registry.lock();
        self.ensure_content(&mut reg, ino)?;
        let id = reg.remote_id(ino)?;
        let offset = usize::try_from(offset).map_err(|_| FsError::TooLarge)?;

        let entry = reg.resolve_mut(ino)?;
        let current = entry
            .cached_content()
            .unwrap_or_else(|| unreachable!("content ensured above"));
        let next = splice(current, offset, data);
        let is_document = match &entry.kind {
            EntryKind::Directory { .. } => return Err(FsError::IsADirectory),
            EntryKind::Page { .. } => {
                if std::str::from_utf8(&next).is_err() {
                    return Err(FsError::NotText);
                }
                true
            }
            EntryKind::Attachment { .. } => false,
        };
        entry.set_content(next);
        entry.touch_modified();

        // Write-through: the remote store sees every write before the
        // verb returns.
        let bytes = entry
            .cached_content()
            .unwrap_or_else(|| unreachable!("content was just cached"));
        if is_document {
            let text = std::str::from_utf8(bytes)
                .unwrap_or_else(|_| unreachable!("validated before caching"));
            self.api.set_document(&id, text)?;
        } else {
            self.api.set_attachment(&id, bytes, true)?;
        }
        trace!(id = %id, bytes = data.len(), "write persisted");
        Ok(data.len() as u32)
    }

    #[instrument(skip(self))]
    pub fn create(&self, parent: Inode, file_name: &str) -> Result<fuser::FileAttr, FsError> {
        let mut reg = self.registry.lock();
        ensure_populated(&mut reg, &self.api, parent)?;
        if reg.child_of(parent, file_name).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        let entry = match NameClass::parse(file_name)? {
            NameClass::Page { name } => WikiEntry::new_page(name, parent),
            NameClass::Attachment { name } => WikiEntry::new_attachment(name, parent),
        };
        let ino = reg.register(entry);
        reg.bind_child(parent, file_name.to_owned(), ino)?;
        debug!(parent, file_name, ino, "created entry");
        reg.attr(ino)
    }

    #[instrument(skip(self))]
    pub fn unlink(&self, parent: Inode, file_name: &str) -> Result<(), FsError> {
        let mut reg = self.registry.lock();
        ensure_populated(&mut reg, &self.api, parent)?;
        let child = reg.child_of(parent, file_name)?;
        let id = reg.remote_id(child)?;

        if matches!(reg.resolve(child)?.kind, EntryKind::Directory { .. }) {
            return Err(FsError::IsADirectory);
        }
        if matches!(reg.resolve(child)?.kind, EntryKind::Page { .. }) {
            // An empty page already reads as deleted remotely, so only
            // non-empty content warrants the round trip.
            self.ensure_content(&mut reg, child)?;
            let loaded = reg
                .resolve(child)?
                .cached_content()
                .unwrap_or_else(|| unreachable!("content ensured above"));
            if loaded.is_empty() {
                trace!(id = %id, "page is empty, skipping the remote delete");
            } else {
                debug!(id = %id, "deleting document");
                self.api.delete_document(&id)?;
            }
        } else {
            debug!(id = %id, "deleting attachment");
            self.api.delete_attachment(&id)?;
        }

        reg.remove_child(parent, file_name)?;
        reg.unregister(child);
        Ok(())
    }

    // ── Mount-wide figures ────────────────────────────────────────────

    pub fn statfs(&self) -> FsStats {
        let reg = self.registry.lock();
        FsStats {
            block_size: BLOCK_SIZE,
            total_inodes: reg.entry_count() as u64,
            max_filename_length: 255,
        }
    }

    // ── Content loading ───────────────────────────────────────────────

    /// Fetch a leaf's bytes if the cache is still unloaded.
    fn ensure_content(&self, reg: &mut Registry, ino: Inode) -> Result<(), FsError> {
        if reg.resolve(ino)?.cached_content().is_some() {
            return Ok(());
        }
        let id = reg.remote_id(ino)?;
        let bytes = match reg.resolve(ino)?.kind {
            EntryKind::Directory { .. } => return Err(FsError::IsADirectory),
            EntryKind::Page { .. } => self.api.get_document(&id)?.into_bytes(),
            EntryKind::Attachment { .. } => self.api.get_attachment(&id)?,
        };
        debug!(id = %id, bytes = bytes.len(), "fetched remote content");
        reg.resolve_mut(ino)?.set_content(bytes);
        Ok(())
    }
}

/// Patch `data` into `original` at `offset`, zero-filling any gap
/// between the current end and the write position.
fn splice(original: &[u8], offset: usize, data: &[u8]) -> Vec<u8> {
    let mut buffer = original.to_vec();
    let end = offset.saturating_add(data.len());
    if buffer.len() < end {
        buffer.resize(end, 0);
    }
    buffer[offset..end].copy_from_slice(data);
    buffer
}
