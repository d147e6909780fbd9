//! Domain types shared across the harness.

pub mod config;
pub mod document;
pub mod enrichment;
pub mod query;
