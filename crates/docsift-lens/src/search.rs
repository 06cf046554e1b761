//! Hybrid BM25/cosine ranking over an [`InvertedIndex`], with highlighted
//! snippets.
//!
//! Only documents sharing at least one query term are scored. Each candidate
//! gets `bm25 * (1 - α) + cosine * α`, where the cosine is taken over raw
//! term frequencies of the query terms.

use std::cmp::Ordering;
use std::collections::HashMap;

use docsift_core::Hit;

use crate::index::InvertedIndex;
use crate::tokenize::tokenize;

/// BM25 term-frequency saturation.
pub const BM25_K1: f64 = 1.5;

/// BM25 document-length normalization.
pub const BM25_B: f64 = 0.75;

/// Weight of the cosine component in the blended score.
pub const BLEND_ALPHA: f64 = 0.2;

/// Maximum snippet length in chars.
pub const DEFAULT_SNIPPET_CHARS: usize = 220;

const EPSILON: f64 = 1e-9;

/// BM25 contribution of one query term to one document.
///
/// The idf is `ln((n - df + 0.5) / (df + 0.5))` and is not clamped, so a
/// term present in most of a small corpus contributes negatively. Returns 0
/// when `df` is 0.
///
/// # Examples
///
/// ```
/// use docsift_lens::search::bm25_term;
///
/// let rare = bm25_term(1, 1, 10, 4, 4.0);
/// let common = bm25_term(1, 9, 10, 4, 4.0);
/// assert!(rare > 0.0);
/// assert!(common < 0.0);
/// assert_eq!(bm25_term(3, 0, 10, 4, 4.0), 0.0);
/// ```
pub fn bm25_term(tf: usize, df: usize, documents: usize, doc_len: usize, avg_doc_len: f64) -> f64 {
    if df == 0 {
        return 0.0;
    }
    let n = documents as f64;
    let df = df as f64;
    let tf = tf as f64;
    let idf = ((n - df + 0.5) / (df + 0.5 + EPSILON)).ln();
    let length_ratio = doc_len as f64 / avg_doc_len;
    let numerator = tf * (BM25_K1 + 1.0);
    let denominator = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * length_ratio);
    idf * (numerator / (denominator + EPSILON))
}

/// Sum of [`bm25_term`] over `terms` for document `doc`.
///
/// Repeated query terms contribute once per occurrence.
pub fn bm25_score<S: AsRef<str>>(index: &InvertedIndex, terms: &[S], doc: usize) -> f64 {
    terms
        .iter()
        .map(|term| {
            let term = term.as_ref();
            bm25_term(
                index.tf(term, doc),
                index.df(term),
                index.len(),
                index.doc_len(doc),
                index.avg_doc_len(),
            )
        })
        .sum()
}

/// Cosine similarity between the query's term counts and document `doc`'s
/// counts of those same terms. Zero when either side has no weight.
pub fn cosine_tf<S: AsRef<str>>(index: &InvertedIndex, terms: &[S], doc: usize) -> f64 {
    let mut query_freq: HashMap<&str, usize> = HashMap::new();
    for term in terms {
        *query_freq.entry(term.as_ref()).or_insert(0) += 1;
    }

    let mut dot = 0.0;
    let mut query_norm = 0.0;
    let mut doc_norm = 0.0;
    for (term, qf) in query_freq {
        let qf = qf as f64;
        let df = index.tf(term, doc) as f64;
        dot += qf * df;
        query_norm += qf * qf;
        doc_norm += df * df;
    }

    if query_norm == 0.0 || doc_norm == 0.0 {
        return 0.0;
    }
    dot / (query_norm.sqrt() * doc_norm.sqrt())
}

/// Rank documents against `query`, returning at most `k` hits with
/// [`DEFAULT_SNIPPET_CHARS`] snippets.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsift_core::Chunk;
/// use docsift_lens::index::InvertedIndex;
/// use docsift_lens::search::search;
///
/// let chunks: Vec<Chunk> = ["the cat sat", "dogs bark loudly", "cats and dogs play"]
///     .iter()
///     .enumerate()
///     .map(|(i, text)| Chunk {
///         id: format!("pets.md:{i}"),
///         path: PathBuf::from("pets.md"),
///         text: text.to_string(),
///         position: i,
///     })
///     .collect();
/// let index = InvertedIndex::build(&chunks);
///
/// let hits = search(&index, "dogs", 2);
/// assert_eq!(hits.len(), 2);
/// assert!(hits.iter().all(|h| h.id != "pets.md:0"));
/// ```
pub fn search(index: &InvertedIndex, query: &str, k: usize) -> Vec<Hit> {
    search_with(index, query, k, DEFAULT_SNIPPET_CHARS)
}

/// [`search`] with an explicit snippet length.
pub fn search_with(index: &InvertedIndex, query: &str, k: usize, snippet_chars: usize) -> Vec<Hit> {
    let terms = tokenize(query);
    if terms.is_empty() || index.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f64)> = index
        .candidates(&terms)
        .into_iter()
        .map(|doc| {
            let bm25 = bm25_score(index, &terms, doc);
            let cosine = cosine_tf(index, &terms, doc);
            (doc, bm25 * (1.0 - BLEND_ALPHA) + cosine * BLEND_ALPHA)
        })
        .collect();

    // Stable sort keeps corpus order among equal scores.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);

    scored
        .into_iter()
        .filter_map(|(doc, score)| {
            let document = index.document(doc)?;
            Some(Hit {
                id: document.id.clone(),
                score,
                snippet: snippet(&document.text, &terms, snippet_chars),
            })
        })
        .collect()
}

/// Excerpt of at most `max` chars around the first query term found in
/// `text`, with each term (and its capitalized form) wrapped in `**`.
///
/// Terms are tried in order; the first one present in the lowercased text
/// anchors a window starting `max / 3` chars before it. When no term is
/// present the leading `max` chars are returned, followed by `…` if the text
/// was cut.
///
/// # Examples
///
/// ```
/// use docsift_lens::search::snippet;
///
/// let terms = vec!["docker".to_string()];
/// assert_eq!(
///     snippet("Run Docker or docker compose", &terms, 100),
///     "Run **Docker** or **docker** compose"
/// );
/// assert_eq!(snippet("nothing relevant here", &terms, 7), "nothing…");
/// ```
pub fn snippet<S: AsRef<str>>(text: &str, terms: &[S], max: usize) -> String {
    // ASCII lowering keeps byte offsets aligned with `text`; terms are ASCII.
    let lowered = text.to_ascii_lowercase();
    let terms: Vec<&str> = terms
        .iter()
        .map(|term| term.as_ref())
        .filter(|term| !term.is_empty())
        .collect();
    let anchor = terms.iter().find_map(|term| lowered.find(term));

    let Some(byte_pos) = anchor else {
        if text.chars().count() <= max {
            return text.to_string();
        }
        let head: String = text.chars().take(max).collect();
        return format!("{head}…");
    };

    let char_pos = text[..byte_pos].chars().count();
    let start = char_pos.saturating_sub(max / 3);
    let mut segment: String = text.chars().skip(start).take(max).collect();

    let mut emphasized: Vec<&str> = Vec::new();
    for term in terms {
        if emphasized.contains(&term) {
            continue;
        }
        emphasized.push(term);
        segment = segment.replace(term, &format!("**{term}**"));
        let title = title_case(term);
        if title != term {
            segment = segment.replace(&title, &format!("**{title}**"));
        }
    }
    segment
}

/// Uppercase the first char of `term`.
pub fn title_case(term: &str) -> String {
    let mut chars = term.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
