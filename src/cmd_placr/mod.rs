//! Subcommand modules for the `placr` binary.

pub mod classify;
pub mod graph;
pub mod index;
pub mod merge;
pub mod upset;
