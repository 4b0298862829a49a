//! dokufs shared library.

pub mod app_config;
pub mod daemon;
/// The filesystem core: entries, registry, verbs, and the FUSE glue.
pub mod fs;
pub mod trc;
