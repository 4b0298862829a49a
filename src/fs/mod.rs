//! The wiki filesystem core.
//!
//! A wiki addresses content by flat, colon-delimited ids (`a:b:c`). This
//! module materializes those ids into a directory tree on demand, caches
//! attributes and content per entry, and writes every mutation straight
//! back to the wiki.

pub mod api;
pub mod entry;
mod error;
pub mod fuse;
mod ops;
mod populate;
mod registry;

pub use error::FsError;
pub use ops::{DirRow, FsStats, WikiFs};

/// Process-local handle identifying one materialized entry.
pub type Inode = u64;

/// The mount root's inode, fixed by the kernel protocol.
pub const ROOT_INO: Inode = 1;
