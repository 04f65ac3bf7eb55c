//! Graph algorithms over bound submodules.
pub mod submodules;

pub use submodules::SubmoduleGraph;
