//! In-memory representation of one mounted wiki object.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::fs::{FsError, Inode};

/// Suffix that marks a file as a wiki document in the mounted tree.
///
/// The remote id never carries it; only the visible filename does.
pub const PAGE_SUFFIX: &str = ".doku";

/// What an entry is, plus its lazily-materialized payload.
///
/// `None` means "known to exist, not fetched yet"; `Some` means the cache
/// holds the authoritative local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory {
        children: Option<BTreeMap<String, Inode>>,
    },
    Page {
        content: Option<Vec<u8>>,
        size: u64,
    },
    Attachment {
        content: Option<Vec<u8>>,
        size: u64,
    },
}

/// One node of the mounted tree.
#[derive(Debug, Clone)]
pub struct WikiEntry {
    /// Zero until the registry assigns a real inode.
    pub ino: Inode,
    /// Bare namespace segment, without [`PAGE_SUFFIX`].
    pub name: String,
    /// `None` only for the root.
    pub parent: Option<Inode>,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub kind: EntryKind,
}

impl WikiEntry {
    // ── Constructors ──────────────────────────────────────────────────

    /// The mount root, always unpopulated at birth.
    pub fn root() -> Self {
        let now = SystemTime::now();
        Self {
            ino: crate::fs::ROOT_INO,
            name: String::new(),
            parent: None,
            atime: now,
            mtime: now,
            ctime: now,
            kind: EntryKind::Directory { children: None },
        }
    }

    /// An intermediate namespace directory, children unknown.
    pub fn directory(name: impl Into<String>, parent: Inode) -> Self {
        let now = SystemTime::now();
        Self {
            ino: 0,
            name: name.into(),
            parent: Some(parent),
            atime: now,
            mtime: now,
            ctime: now,
            kind: EntryKind::Directory { children: None },
        }
    }

    /// A freshly created directory with zero children, already populated.
    pub fn empty_directory(name: impl Into<String>, parent: Inode) -> Self {
        let mut entry = Self::directory(name, parent);
        entry.kind = EntryKind::Directory {
            children: Some(BTreeMap::new()),
        };
        entry
    }

    /// A document discovered via a remote listing; content not yet fetched.
    pub fn page_from_listing(name: impl Into<String>, parent: Inode, mtime: u64, size: u64) -> Self {
        let stamp = systime(mtime);
        Self {
            ino: 0,
            name: name.into(),
            parent: Some(parent),
            atime: stamp,
            mtime: stamp,
            ctime: stamp,
            kind: EntryKind::Page {
                content: None,
                size,
            },
        }
    }

    /// An attachment discovered via a remote listing; content not yet fetched.
    pub fn attachment_from_listing(
        name: impl Into<String>,
        parent: Inode,
        mtime: u64,
        size: u64,
    ) -> Self {
        let stamp = systime(mtime);
        Self {
            ino: 0,
            name: name.into(),
            parent: Some(parent),
            atime: stamp,
            mtime: stamp,
            ctime: stamp,
            kind: EntryKind::Attachment {
                content: None,
                size,
            },
        }
    }

    /// A brand-new document, empty and loaded. Nothing is saved remotely
    /// until the first write.
    pub fn new_page(name: impl Into<String>, parent: Inode) -> Self {
        let now = SystemTime::now();
        Self {
            ino: 0,
            name: name.into(),
            parent: Some(parent),
            atime: now,
            mtime: now,
            ctime: now,
            kind: EntryKind::Page {
                content: Some(Vec::new()),
                size: 0,
            },
        }
    }

    /// A brand-new attachment, empty and loaded.
    pub fn new_attachment(name: impl Into<String>, parent: Inode) -> Self {
        let now = SystemTime::now();
        Self {
            ino: 0,
            name: name.into(),
            parent: Some(parent),
            atime: now,
            mtime: now,
            ctime: now,
            kind: EntryKind::Attachment {
                content: Some(Vec::new()),
                size: 0,
            },
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────

    /// Name as shown in directory listings. Documents grow [`PAGE_SUFFIX`].
    pub fn filename(&self) -> String {
        match self.kind {
            EntryKind::Page { .. } => format!("{}{PAGE_SUFFIX}", self.name),
            _ => self.name.clone(),
        }
    }

    /// Byte size to report. A loaded buffer is authoritative over the
    /// size the listing claimed.
    pub fn size(&self) -> u64 {
        match &self.kind {
            EntryKind::Directory { .. } => 0,
            EntryKind::Page { content, size } | EntryKind::Attachment { content, size } => content
                .as_ref()
                .map_or(*size, |bytes| bytes.len() as u64),
        }
    }

    pub fn file_type(&self) -> fuser::FileType {
        match self.kind {
            EntryKind::Directory { .. } => fuser::FileType::Directory,
            EntryKind::Page { .. } | EntryKind::Attachment { .. } => fuser::FileType::RegularFile,
        }
    }

    /// Cached bytes, if fetched. `None` for directories and unloaded leaves.
    pub fn cached_content(&self) -> Option<&[u8]> {
        match &self.kind {
            EntryKind::Directory { .. } => None,
            EntryKind::Page { content, .. } | EntryKind::Attachment { content, .. } => {
                content.as_deref()
            }
        }
    }

    /// Replace the cached bytes and the reported size together.
    pub fn set_content(&mut self, bytes: Vec<u8>) {
        match &mut self.kind {
            EntryKind::Directory { .. } => {}
            EntryKind::Page { content, size } | EntryKind::Attachment { content, size } => {
                *size = bytes.len() as u64;
                *content = Some(bytes);
            }
        }
    }

    pub fn touch_modified(&mut self) {
        let now = SystemTime::now();
        self.mtime = now;
        self.ctime = now;
    }

    pub fn touch_accessed(&mut self) {
        self.atime = SystemTime::now();
    }
}

/// How a new filename classifies, with the bare segment it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameClass {
    Page { name: String },
    Attachment { name: String },
}

impl NameClass {
    /// Decide what a to-be-created filename would become on the wiki.
    ///
    /// Dotfiles, editor backups, and extensionless names are refused so
    /// that stray artifacts never turn into remote objects.
    pub fn parse(file_name: &str) -> Result<Self, FsError> {
        if file_name.starts_with('.') {
            return Err(FsError::Unwritable);
        }
        if file_name.ends_with('~') {
            return Err(FsError::Unwritable);
        }
        if let Some(stem) = file_name.strip_suffix(PAGE_SUFFIX)
            && !stem.is_empty()
        {
            return Ok(Self::Page {
                name: stem.to_owned(),
            });
        }
        if !file_name.contains('.') {
            return Err(FsError::Unwritable);
        }
        Ok(Self::Attachment {
            name: file_name.to_owned(),
        })
    }
}

/// Epoch seconds, as remote listings report them, to a [`SystemTime`].
fn systime(epoch_seconds: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(epoch_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_list_with_the_suffix_attached() {
        let entry = WikiEntry::page_from_listing("design", 1, 0, 10);
        assert_eq!(entry.filename(), "design.doku");
        assert_eq!(entry.name, "design");
    }

    #[test]
    fn attachments_and_directories_list_verbatim() {
        let dir = WikiEntry::directory("proj", 1);
        let media = WikiEntry::attachment_from_listing("logo.png", 1, 0, 10);
        assert_eq!(dir.filename(), "proj");
        assert_eq!(media.filename(), "logo.png");
    }

    #[test]
    fn loaded_bytes_override_the_listed_size() {
        let mut entry = WikiEntry::page_from_listing("design", 1, 0, 999);
        assert_eq!(entry.size(), 999, "before fetch the listing size stands");
        entry.set_content(b"abc".to_vec());
        assert_eq!(entry.size(), 3, "after fetch the buffer wins");
    }

    #[test]
    fn fresh_leaves_start_loaded_and_empty() {
        let page = WikiEntry::new_page("notes", 1);
        let media = WikiEntry::new_attachment("chart.svg", 1);
        assert_eq!(page.cached_content(), Some(&b""[..]));
        assert_eq!(media.cached_content(), Some(&b""[..]));
        assert_eq!(page.size(), 0);
    }

    #[test]
    fn classification_accepts_documents_and_attachments() {
        assert_eq!(
            NameClass::parse("notes.doku").expect("documents are writable"),
            NameClass::Page {
                name: "notes".to_owned()
            }
        );
        assert_eq!(
            NameClass::parse("logo.png").expect("attachments are writable"),
            NameClass::Attachment {
                name: "logo.png".to_owned()
            }
        );
    }

    #[test]
    fn classification_refuses_artifact_names() {
        for name in [".hidden", ".hidden.doku", "backup~", "noext", ".doku"] {
            assert!(
                matches!(NameClass::parse(name), Err(FsError::Unwritable)),
                "{name} should be unwritable"
            );
        }
    }

    #[test]
    fn touch_modified_moves_both_stamps() {
        let mut entry = WikiEntry::page_from_listing("design", 1, 0, 0);
        let before = entry.mtime;
        entry.touch_modified();
        assert!(entry.mtime >= before);
        assert_eq!(entry.mtime, entry.ctime);
    }
}
