//! Directory walking and overlapping-window chunking.
//!
//! Walks a documentation tree with the `ignore` crate, keeps files whose
//! category is selected (documentation always, code on request), and splits
//! each file's text into fixed-size character windows that overlap.

pub mod chunker;
pub mod walker;

pub use chunker::{chunk_dir, chunk_files, chunk_ranges, chunk_text, ChunkOptions, DEFAULT_CHUNK_SIZE};
pub use walker::{walk_docs, SourceFile};
