//! Retrieval strategy set.
//!
//! Each strategy maps a query set and a result bound to ranked chunk-id
//! lists, backed by a [`VectorStore`](crate::VectorStore). Lexical and
//! hybrid queries are punctuation-stripped first; semantic queries are
//! embedded as written.

pub mod normalize;
pub mod retriever;
pub mod strategy;

pub use normalize::strip_punctuation;
pub use retriever::Retriever;
pub use strategy::Strategy;
