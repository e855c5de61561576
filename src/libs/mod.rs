pub mod anno;
pub mod classify;
pub mod graph;
pub mod interaction;
pub mod upset;
