//! Vector store implementations.

pub mod fusion;
pub mod lexical;
pub mod memory;

pub use fusion::{fuse_hits, LinearCombination, RRF_K};
pub use lexical::{tokenize, LexicalIndex};
pub use memory::MemoryStore;
