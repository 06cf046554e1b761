//! In-memory inverted index over chunk text.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use docsift_core::Chunk;
use serde::Serialize;
use tracing::info;

use crate::tokenize::tokenize;

/// A document as seen by the index: the chunk id and its raw text.
#[derive(Debug, Clone)]
pub struct IndexedDoc {
    pub id: String,
    pub text: String,
}

/// Summary numbers for an [`InvertedIndex`].
///
/// # Examples
///
/// ```
/// use docsift_lens::index::IndexStats;
///
/// let stats = IndexStats { documents: 2, vocabulary_size: 5, avg_doc_len: 3.5 };
/// let json = serde_json::to_string(&stats).unwrap();
/// assert!(json.contains("\"vocabularySize\":5"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub documents: usize,
    pub vocabulary_size: usize,
    pub avg_doc_len: f64,
}

/// Term postings, document frequencies and document lengths for a corpus.
///
/// Documents are addressed by their position in the chunk slice given to
/// [`build`](Self::build), so chunks sharing an id stay distinct. The index
/// is immutable once built; a changed corpus needs a fresh build.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsift_core::Chunk;
/// use docsift_lens::index::InvertedIndex;
///
/// let chunks: Vec<Chunk> = ["dogs bark", "cats purr"]
///     .iter()
///     .enumerate()
///     .map(|(i, text)| Chunk {
///         id: format!("pets.md:{i}"),
///         path: PathBuf::from("pets.md"),
///         text: text.to_string(),
///         position: i,
///     })
///     .collect();
///
/// let index = InvertedIndex::build(&chunks);
/// assert_eq!(index.len(), 2);
/// assert_eq!(index.df("dogs"), 1);
/// assert_eq!(index.avg_doc_len(), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct InvertedIndex {
    documents: Vec<IndexedDoc>,
    df: HashMap<String, usize>,
    tf: HashMap<String, BTreeMap<usize, usize>>,
    doc_len: Vec<usize>,
    avg_doc_len: f64,
}

impl InvertedIndex {
    /// Tokenize every chunk and build the postings.
    pub fn build(chunks: &[Chunk]) -> Self {
        let mut documents = Vec::with_capacity(chunks.len());
        let mut df: HashMap<String, usize> = HashMap::new();
        let mut tf: HashMap<String, BTreeMap<usize, usize>> = HashMap::new();
        let mut doc_len = Vec::with_capacity(chunks.len());

        for (doc, chunk) in chunks.iter().enumerate() {
            let terms = tokenize(&chunk.text);
            for term in &terms {
                let postings = tf.entry(term.clone()).or_default();
                let count = postings.entry(doc).or_insert(0);
                if *count == 0 {
                    *df.entry(term.clone()).or_insert(0) += 1;
                }
                *count += 1;
            }
            doc_len.push(terms.len());
            documents.push(IndexedDoc {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
            });
        }

        let avg_doc_len = if documents.is_empty() {
            0.0
        } else {
            doc_len.iter().sum::<usize>() as f64 / documents.len() as f64
        };

        info!(
            documents = documents.len(),
            terms = df.len(),
            avg_doc_len,
            "built inverted index"
        );

        Self {
            documents,
            df,
            tf,
            doc_len,
            avg_doc_len,
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, doc: usize) -> Option<&IndexedDoc> {
        self.documents.get(doc)
    }

    /// Number of documents containing `term`.
    pub fn df(&self, term: &str) -> usize {
        self.df.get(term).copied().unwrap_or(0)
    }

    /// Occurrences of `term` in document `doc`.
    pub fn tf(&self, term: &str, doc: usize) -> usize {
        self.tf
            .get(term)
            .and_then(|postings| postings.get(&doc))
            .copied()
            .unwrap_or(0)
    }

    /// Term count of document `doc`.
    pub fn doc_len(&self, doc: usize) -> usize {
        self.doc_len.get(doc).copied().unwrap_or(0)
    }

    /// Mean term count per document; 0 for an empty index.
    pub fn avg_doc_len(&self) -> f64 {
        self.avg_doc_len
    }

    /// Number of distinct terms.
    pub fn vocabulary_size(&self) -> usize {
        self.df.len()
    }

    /// Documents containing at least one of `terms`, read from the postings.
    pub fn candidates<S: AsRef<str>>(&self, terms: &[S]) -> BTreeSet<usize> {
        terms
            .iter()
            .filter_map(|term| self.tf.get(term.as_ref()))
            .flat_map(|postings| postings.keys().copied())
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.len(),
            vocabulary_size: self.vocabulary_size(),
            avg_doc_len: self.avg_doc_len,
        }
    }
}
