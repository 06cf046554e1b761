//! Core types, configuration, and error handling for docsift.
//!
//! This crate provides the shared foundation used by all other docsift crates:
//! - [`DocsiftError`]: unified error type using `thiserror`
//! - [`DocsiftConfig`]: configuration loaded from `.docsift.toml`
//! - Shared types: [`Chunk`], [`Hit`], [`FileCategory`], [`ChunkPayload`],
//!   [`VectorPoint`], [`ScoredPoint`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    DocsiftConfig, EmbeddingConfig, FileTypes, IndexingConfig, LoggingConfig, SearchConfig,
};
pub use error::DocsiftError;
pub use types::{
    Chunk, ChunkPayload, FileCategory, Hit, OutputFormat, ScoredPoint, VectorPoint,
};
