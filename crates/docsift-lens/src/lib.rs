//! Local retrieval: TF-IDF embeddings and hybrid lexical search.
//!
//! Provides a model-free embedding provider (TF-IDF folded into a fixed
//! dimension by feature hashing), an in-memory inverted index, and a hybrid
//! BM25 + cosine scorer with highlighted snippets. Also shapes chunks into
//! `(id, vector, payload)` points for an external vector store.

pub mod embedding;
pub mod engine;
pub mod index;
pub mod points;
pub mod search;
pub mod tokenize;

pub use embedding::{embed_text, EmbeddingProvider, TfidfEmbedder, Vocabulary};
pub use engine::Engine;
pub use index::{IndexStats, InvertedIndex};
pub use search::{search, snippet};
