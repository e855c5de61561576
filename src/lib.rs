pub mod libs;

pub use libs::anno;
pub use libs::classify;
pub use libs::graph;
pub use libs::interaction;
pub use libs::upset;
