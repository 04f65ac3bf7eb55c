//! Human-readable renderings of module configurations.
pub mod tree;

pub use tree::format_tree;
