//! Glue between the kernel's FUSE verbs and [`WikiFs`].
//!
//! Each handler unpacks the request, delegates, and folds the outcome
//! into the matching reply. No filesystem logic lives here.

use std::ffi::OsStr;
use std::time::{Duration, SystemTime};

use fuser::{
    Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use tracing::{debug, instrument};

use crate::fs::api::ContentApi;
use crate::fs::ops::WikiFs;

/// Content can change remotely at any time; keep the kernel's view on
/// a short leash.
const TTL: Duration = Duration::from_secs(1);

/// Non-UTF-8 names cannot exist on the wiki, so they resolve to nothing.
fn name_str(name: &OsStr) -> Result<&str, i32> {
    name.to_str().ok_or(libc::ENOENT)
}

pub struct WikiFuse<A> {
    fs: WikiFs<A>,
}

impl<A: ContentApi> WikiFuse<A> {
    pub fn new(fs: WikiFs<A>) -> Self {
        Self { fs }
    }
}

impl<A: ContentApi> Filesystem for WikiFuse<A> {
    #[instrument(name = "WikiFuse::lookup", skip(self, _req, reply))]
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = match name_str(name) {
            Ok(name) => name,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.lookup(parent, name) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[instrument(name = "WikiFuse::getattr", skip(self, _req, reply))]
    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        match self.fs.getattr(ino) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[instrument(name = "WikiFuse::setattr", skip_all, fields(ino, size))]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        // Only size changes carry meaning here; chmod and friends are
        // accepted and dropped.
        match self.fs.setattr(ino, size) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[instrument(name = "WikiFuse::access", skip(self, _req, reply))]
    fn access(&mut self, _req: &Request<'_>, ino: u64, _mask: i32, reply: ReplyEmpty) {
        match self.fs.access(ino) {
            Ok(()) => reply.ok(),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[instrument(name = "WikiFuse::opendir", skip(self, _req, reply))]
    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.fs.opendir(ino) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[instrument(name = "WikiFuse::readdir", skip(self, _req, reply))]
    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let rows = match self.fs.readdir(ino) {
            Ok(rows) => rows,
            Err(e) => {
                debug!(error = %e, "replying error");
                return reply.error(e.into());
            }
        };
        let skip = usize::try_from(offset).unwrap_or(0);
        for (idx, row) in rows.iter().enumerate().skip(skip) {
            // The offset handed back on the next call is the number of
            // rows already consumed.
            if reply.add(row.ino, (idx + 1) as i64, row.kind, &row.name) {
                break;
            }
        }
        reply.ok();
    }

    #[instrument(name = "WikiFuse::open", skip(self, _req, reply))]
    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.fs.open(ino) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[instrument(name = "WikiFuse::read", skip(self, _req, reply))]
    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.fs.read(ino, offset.cast_unsigned(), size) {
            Ok(bytes) => reply.data(&bytes),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[instrument(name = "WikiFuse::write", skip(self, _req, data, reply), fields(bytes = data.len()))]
    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.fs.write(ino, offset.cast_unsigned(), data) {
            Ok(written) => reply.written(written),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[instrument(name = "WikiFuse::create", skip(self, _req, reply))]
    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let name = match name_str(name) {
            Ok(name) => name,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.create(parent, name) {
            Ok(attr) => reply.created(&TTL, &attr, 0, 0, 0),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[instrument(name = "WikiFuse::unlink", skip(self, _req, reply))]
    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = match name_str(name) {
            Ok(name) => name,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.unlink(parent, name) {
            Ok(()) => reply.ok(),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[instrument(name = "WikiFuse::mkdir", skip(self, _req, reply))]
    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let name = match name_str(name) {
            Ok(name) => name,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.mkdir(parent, name) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[instrument(name = "WikiFuse::rmdir", skip(self, _req, reply))]
    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = match name_str(name) {
            Ok(name) => name,
            Err(errno) => return reply.error(errno),
        };
        match self.fs.rmdir(parent, name) {
            Ok(()) => reply.ok(),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(e.into());
            }
        }
    }

    #[instrument(name = "WikiFuse::statfs", skip(self, _req, reply))]
    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let stats = self.fs.statfs();
        reply.statfs(
            0,
            0,
            0,
            stats.total_inodes,
            0,
            stats.block_size,
            stats.max_filename_length,
            stats.block_size,
        );
    }
}
