//! Reference HTTP collaborators.
//!
//! Each is behind a cargo feature so the core builds without an HTTP stack.

#[cfg(any(feature = "openai", feature = "cohere"))]
mod http;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "cohere")]
pub mod cohere;

#[cfg(feature = "openai")]
pub use openai::OpenAI;

#[cfg(feature = "cohere")]
pub use cohere::CohereReranker;
