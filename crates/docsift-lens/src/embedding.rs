//! Local TF-IDF embeddings folded into a fixed dimension.
//!
//! Embedding is two-phase: build a [`Vocabulary`] from a corpus once, then
//! embed any text against that snapshot. Vectors computed against different
//! vocabularies are not comparable, so queries must be embedded with the
//! same snapshot that produced the stored corpus vectors.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use docsift_core::DocsiftError;
use md5::{Digest, Md5};
use tracing::info;

use crate::tokenize::tokenize;

/// Number of buckets each sparse feature is spread over.
const HASH_SEEDS: usize = 3;

/// Digest bytes summed into a bucket position.
const HASH_BYTES: usize = 3;

/// Source of fixed-dimension embedding vectors.
///
/// Implemented locally by [`TfidfEmbedder`]; a remote, model-backed provider
/// can implement the same contract. Vectors from different provider
/// instances must never be mixed in one collection.
pub trait EmbeddingProvider: Send + Sync {
    /// Dimension of every vector returned by [`embed`](Self::embed).
    fn dim(&self) -> usize;

    /// Embed `texts`, returning one vector per text in the same order.
    ///
    /// # Errors
    ///
    /// Implementation-specific; the local provider fails with
    /// [`DocsiftError::NotBuilt`] when it has no vocabulary.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocsiftError>;
}

/// Term → index mapping and IDF table built from one corpus.
///
/// Indices follow the lexicographic order of the unique terms, so the same
/// corpus always yields the same indices.
///
/// # Examples
///
/// ```
/// use docsift_lens::embedding::Vocabulary;
///
/// let vocab = Vocabulary::build(&["dogs bark", "cats purr"]);
/// assert_eq!(vocab.len(), 4);
/// assert_eq!(vocab.index_of("bark"), Some(0));
/// assert_eq!(vocab.index_of("purr"), Some(3));
/// ```
#[derive(Debug, Clone)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    idf: HashMap<String, f64>,
    documents: usize,
}

impl Vocabulary {
    /// Build the vocabulary and IDF table from `corpus`.
    ///
    /// `idf(term) = ln(documents / (df + 1))`, where `df` counts each
    /// document once however often the term repeats in it.
    pub fn build<S: AsRef<str>>(corpus: &[S]) -> Self {
        let mut terms = BTreeSet::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for text in corpus {
            let mut seen = HashSet::new();
            for term in tokenize(text.as_ref()) {
                if seen.insert(term.clone()) {
                    *doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
                terms.insert(term);
            }
        }

        let index: HashMap<String, usize> = terms
            .into_iter()
            .enumerate()
            .map(|(i, term)| (term, i))
            .collect();

        let documents = corpus.len();
        let total = documents as f64;
        let idf = doc_freq
            .into_iter()
            .map(|(term, df)| (term, (total / (df as f64 + 1.0)).ln()))
            .collect();

        info!(documents, terms = index.len(), "built vocabulary");

        Self {
            index,
            idf,
            documents,
        }
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of corpus documents the vocabulary was built from.
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Vocabulary index of `term`, if it occurred in the corpus.
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// IDF of `term`, if it occurred in the corpus. May be zero or negative
    /// for terms present in most documents.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }
}

/// Embed `text` against `vocabulary` into a vector of exactly `dim` floats.
///
/// Steps: normalized term frequency × IDF per known term (unknown terms are
/// ignored); each `(index, weight)` is folded into three buckets chosen from
/// the MD5 of `"<index>_<seed>"`; the result is L2-normalized. A text with no
/// known terms yields the all-zero vector. Output is bit-identical for the
/// same text and vocabulary.
///
/// # Examples
///
/// ```
/// use docsift_lens::embedding::{embed_text, Vocabulary};
///
/// let vocab = Vocabulary::build(&["rust borrow checker", "python gil", "go channels"]);
/// let v = embed_text(&vocab, "borrow checker rules", 64);
/// assert_eq!(v.len(), 64);
/// assert_eq!(v, embed_text(&vocab, "borrow checker rules", 64));
/// ```
pub fn embed_text(vocabulary: &Vocabulary, text: &str, dim: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dim];
    if dim == 0 {
        return vector;
    }

    let terms = tokenize(text);
    if terms.is_empty() {
        return vector;
    }

    let mut counts: HashMap<&str, f64> = HashMap::new();
    for term in &terms {
        *counts.entry(term.as_str()).or_insert(0.0) += 1.0;
    }
    let total = terms.len() as f64;

    // Ordered by index so the float accumulation order is fixed.
    let mut sparse: BTreeMap<usize, f64> = BTreeMap::new();
    for (term, count) in counts {
        if let (Some(idx), Some(idf)) = (vocabulary.index_of(term), vocabulary.idf(term)) {
            let tf = count / total;
            sparse.insert(idx, tf * idf);
        }
    }

    for (idx, weight) in sparse {
        for seed in 0..HASH_SEEDS {
            let bucket = hash_bucket(idx, seed, dim);
            vector[bucket] += (weight / HASH_SEEDS as f64) as f32;
        }
    }

    l2_normalize(&mut vector);
    vector
}

/// Bucket for feature `index` under hash `seed`: the first three MD5 bytes of
/// `"<index>_<seed>"`, each reduced modulo `dim`, summed modulo `dim`.
fn hash_bucket(index: usize, seed: usize, dim: usize) -> usize {
    let digest = Md5::digest(format!("{index}_{seed}").as_bytes());
    digest[..HASH_BYTES]
        .iter()
        .map(|&b| usize::from(b) % dim)
        .sum::<usize>()
        % dim
}

fn l2_normalize(vector: &mut [f32]) {
    let sum: f32 = vector.iter().map(|v| v * v).sum();
    let norm = f64::from(sum).sqrt() as f32;
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// [`EmbeddingProvider`] backed by a shared [`Vocabulary`] snapshot.
///
/// Construct with [`with_vocabulary`](Self::with_vocabulary) after the build
/// phase. An embedder created with [`new`](Self::new) has no vocabulary and
/// refuses to embed rather than bootstrapping one from whatever batch
/// arrives first.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use docsift_lens::embedding::{EmbeddingProvider, TfidfEmbedder, Vocabulary};
///
/// let unbuilt = TfidfEmbedder::new(128);
/// assert!(unbuilt.embed(&["query".to_string()]).is_err());
///
/// let vocab = Arc::new(Vocabulary::build(&["deploy with docker", "scale with kubernetes"]));
/// let embedder = TfidfEmbedder::with_vocabulary(128, vocab);
/// let vectors = embedder.embed(&["docker deploy".to_string()]).unwrap();
/// assert_eq!(vectors[0].len(), 128);
/// ```
#[derive(Debug, Clone)]
pub struct TfidfEmbedder {
    dim: usize,
    vocabulary: Option<Arc<Vocabulary>>,
}

impl TfidfEmbedder {
    /// Create an embedder without a vocabulary.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vocabulary: None,
        }
    }

    /// Create an embedder bound to `vocabulary`.
    pub fn with_vocabulary(dim: usize, vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            dim,
            vocabulary: Some(vocabulary),
        }
    }

    /// The bound vocabulary.
    ///
    /// # Errors
    ///
    /// Returns [`DocsiftError::NotBuilt`] if no vocabulary is bound.
    pub fn vocabulary(&self) -> Result<&Arc<Vocabulary>, DocsiftError> {
        self.vocabulary
            .as_ref()
            .ok_or_else(|| DocsiftError::NotBuilt("embedding vocabulary".into()))
    }

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns [`DocsiftError::NotBuilt`] if no vocabulary is bound.
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>, DocsiftError> {
        let vocabulary = self.vocabulary()?;
        Ok(embed_text(vocabulary, text, self.dim))
    }
}

impl EmbeddingProvider for TfidfEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocsiftError> {
        let vocabulary = self.vocabulary()?;
        Ok(texts
            .iter()
            .map(|text| embed_text(vocabulary, text, self.dim))
            .collect())
    }
}
