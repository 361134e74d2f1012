//! `marquee-core`: movie/score domain building blocks.
//!
//! This crate contains **pure domain** primitives (no HTTP, no auth).

pub mod catalog;
pub mod error;
pub mod id;

pub use catalog::{InMemoryCatalog, Movie, MovieCatalog, MovieDraft, ScoreSubmission};
pub use error::{DomainError, DomainResult};
pub use id::MovieId;
