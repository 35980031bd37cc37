//! Side-effecting helpers: configuration, process spawning, filesystem.

pub mod config;
pub mod launcher;
pub mod process;
pub mod summary;
pub mod workdir;
