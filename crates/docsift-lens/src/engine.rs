//! Build-once, query-many façade over the vocabulary, the embedder and the
//! inverted index.

use std::sync::Arc;

use docsift_core::{Chunk, DocsiftError, FileTypes, Hit, VectorPoint};
use tracing::info;

use crate::embedding::{TfidfEmbedder, Vocabulary};
use crate::index::{IndexStats, InvertedIndex};
use crate::points::prepare_points;
use crate::search::{search_with, DEFAULT_SNIPPET_CHARS};

/// Retrieval engine built from one chunk set.
///
/// Both the embedding vocabulary and the lexical index are built from the
/// same chunks in [`build`](Self::build) and never change afterwards.
/// Cloning is cheap and clones share the built state, so one engine can
/// serve queries from many threads.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsift_core::Chunk;
/// use docsift_lens::Engine;
///
/// let chunks: Vec<Chunk> = ["install the cli with cargo", "configure logging levels"]
///     .iter()
///     .enumerate()
///     .map(|(i, text)| Chunk {
///         id: format!("guide.md:{i}"),
///         path: PathBuf::from("docs/guide.md"),
///         text: text.to_string(),
///         position: i,
///     })
///     .collect();
///
/// let engine = Engine::build(chunks, 64);
/// let hits = engine.search("logging", 3);
/// assert_eq!(hits[0].id, "guide.md:1");
/// assert_eq!(engine.embed_query("logging").unwrap().len(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    chunks: Arc<Vec<Chunk>>,
    vocabulary: Arc<Vocabulary>,
    index: Arc<InvertedIndex>,
    embedder: TfidfEmbedder,
    snippet_chars: usize,
}

impl Engine {
    /// Build the vocabulary and the inverted index from `chunks`.
    pub fn build(chunks: Vec<Chunk>, dim: usize) -> Self {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vocabulary = Arc::new(Vocabulary::build(&texts));
        let index = Arc::new(InvertedIndex::build(&chunks));
        let embedder = TfidfEmbedder::with_vocabulary(dim, Arc::clone(&vocabulary));

        info!(chunks = chunks.len(), dim, "engine ready");

        Self {
            chunks: Arc::new(chunks),
            vocabulary,
            index,
            embedder,
            snippet_chars: DEFAULT_SNIPPET_CHARS,
        }
    }

    /// Use `snippet_chars` as the snippet length for [`search`](Self::search).
    pub fn with_snippet_chars(mut self, snippet_chars: usize) -> Self {
        self.snippet_chars = snippet_chars;
        self
    }

    /// Lexical hybrid search; at most `k` hits in descending score order.
    pub fn search(&self, query: &str, k: usize) -> Vec<Hit> {
        search_with(&self.index, query, k, self.snippet_chars)
    }

    /// Embed `query` against the corpus vocabulary.
    ///
    /// # Errors
    ///
    /// Never fails for an engine produced by [`build`](Self::build); the
    /// `Result` mirrors the embedder contract.
    pub fn embed_query(&self, query: &str) -> Result<Vec<f32>, DocsiftError> {
        self.embedder.embed_one(query)
    }

    /// Embed every chunk and attach store payloads.
    ///
    /// # Errors
    ///
    /// See [`prepare_points`].
    pub fn points(&self, batch_size: usize, file_types: &FileTypes) -> Result<Vec<VectorPoint>, DocsiftError> {
        prepare_points(&self.chunks, &self.embedder, batch_size, file_types)
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    pub fn index(&self) -> &Arc<InvertedIndex> {
        &self.index
    }

    pub fn embedder(&self) -> &TfidfEmbedder {
        &self.embedder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{embed_text, EmbeddingProvider};
    use std::path::PathBuf;

    fn engine(texts: &[&str], dim: usize) -> Engine {
        let chunks = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                id: format!("notes.md:{i}"),
                path: PathBuf::from("docs/team/notes.md"),
                text: text.to_string(),
                position: i,
            })
            .collect();
        Engine::build(chunks, dim)
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
        assert_send_sync::<Vocabulary>();
        assert_send_sync::<InvertedIndex>();
    }

    #[test]
    fn search_and_stats_share_one_corpus() {
        let engine = engine(&["the cat sat", "dogs bark loudly", "cats and dogs play"], 32);
        let stats = engine.stats();
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.vocabulary_size, engine.vocabulary().len());

        let hits = engine.search("dogs", 2);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.id != "notes.md:0"));
    }

    #[test]
    fn query_embedding_uses_corpus_vocabulary() {
        let engine = engine(&["alpha", "bravo", "bravo", "bravo"], 300);
        let v = engine.embed_query("alpha").unwrap();
        assert_eq!(v, embed_text(engine.vocabulary(), "alpha", 300));
        assert_eq!(engine.embedder().dim(), 300);
    }

    #[test]
    fn points_cover_every_chunk() {
        let engine = engine(&["first window", "second window", "third window"], 16);
        let points = engine.points(2, &FileTypes::default()).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].id, "notes.md:1");
        assert_eq!(points[1].payload.project, "team");
        assert_eq!(points[1].vector, engine.embed_query("second window").unwrap());
    }

    #[test]
    fn snippet_length_is_configurable() {
        let engine = engine(&["kernel panic while booting the machine"], 8).with_snippet_chars(6);
        assert_eq!(engine.search("kernel", 1)[0].snippet, "**kernel**");
    }

    #[test]
    fn concurrent_queries_match_serial_results() {
        let engine = engine(
            &[
                "tokio runtime spawns tasks",
                "rayon splits work across threads",
                "threads share data through arc",
                "tasks yield at await points",
            ],
            64,
        );
        let expected = engine.search("threads tasks", 4);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let engine = engine.clone();
                    scope.spawn(move || engine.search("threads tasks", 4))
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn empty_engine_answers_nothing() {
        let engine = Engine::build(Vec::new(), 8);
        assert!(engine.search("anything", 5).is_empty());
        assert_eq!(engine.stats().avg_doc_len, 0.0);
        assert!(engine.embed_query("anything").unwrap().iter().all(|x| *x == 0.0));
    }
}
