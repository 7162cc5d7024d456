//! Subcommand implementations.

pub mod add;
pub mod delete;
pub mod export;
pub mod init;
pub mod list;
pub mod rename;
pub mod search;
pub mod show;
pub mod status;
