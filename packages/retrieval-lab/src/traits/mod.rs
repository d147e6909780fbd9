//! Collaborator abstractions.
//!
//! The harness never talks to a model, an embedding service or a vector
//! database directly. Each is injected through one of these traits.

pub mod ai;
pub mod store;
pub mod topic;
