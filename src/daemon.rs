//! Mount lifecycle: preflight checks, mounting, and the serve loop.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::fs::WikiFs;
use crate::fs::api::ContentApi;
use crate::fs::fuse::WikiFuse;

#[derive(Debug, Error)]
pub enum MountError {
    #[error("FUSE is not available: {0}")]
    FuseUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(target_os = "linux")]
fn ensure_fuse() -> Result<(), MountError> {
    if Path::new("/dev/fuse").exists() {
        Ok(())
    } else {
        Err(MountError::FuseUnavailable(
            "/dev/fuse is missing; load the fuse kernel module or install fuse3".to_owned(),
        ))
    }
}

#[cfg(target_os = "macos")]
fn ensure_fuse() -> Result<(), MountError> {
    let installed = Path::new("/Library/Filesystems/macfuse.fs").is_dir()
        || Path::new("/Library/Filesystems/osxfuse.fs").is_dir();
    if installed {
        Ok(())
    } else {
        Err(MountError::FuseUnavailable(
            "macFUSE is not installed; install it from https://macfuse.github.io/".to_owned(),
        ))
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn ensure_fuse() -> Result<(), MountError> {
    Ok(())
}

/// Prepares the mount point directory.
///
/// - If the directory exists and is non-empty, returns an error.
/// - If the directory does not exist, creates it (including parents) and logs an info message.
/// - If the directory exists and is empty, does nothing.
fn prepare_mount_point(mount_point: &Path) -> Result<(), std::io::Error> {
    match std::fs::read_dir(mount_point) {
        Ok(mut entries) => {
            if entries.next().transpose()?.is_some() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!(
                        "Mount point '{}' already exists and is not empty.",
                        mount_point.display()
                    ),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::create_dir_all(mount_point)?;
            info!(path = %mount_point.display(), "Created mount point directory.");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Mount the filesystem and serve requests until it is unmounted.
///
/// Blocks the calling thread for the lifetime of the mount.
pub fn run<A: ContentApi>(fs: WikiFs<A>, mount_point: &Path) -> Result<(), MountError> {
    ensure_fuse()?;
    prepare_mount_point(mount_point)?;

    let mount_opts = [
        fuser::MountOption::FSName("dokufs".to_owned()),
        fuser::MountOption::NoDev,
        fuser::MountOption::NoExec,
        fuser::MountOption::NoSuid,
        fuser::MountOption::NoAtime,
        fuser::MountOption::DefaultPermissions,
        fuser::MountOption::AutoUnmount,
    ];

    info!("Mounting filesystem at {}.", mount_point.display());
    fuser::mount2(WikiFuse::new(fs), mount_point, &mount_opts)?;
    info!("Filesystem unmounted, shutting down.");
    Ok(())
}
