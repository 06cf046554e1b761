//! Term extraction shared by the embedding provider and the inverted index.

/// Terms dropped regardless of length.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will", "would",
    "could", "should",
];

/// Terms of this many chars or fewer are dropped.
const MIN_TERM_LEN: usize = 2;

/// Split `text` into lowercase terms.
///
/// Any char outside `[0-9a-z_]` (after lowercasing) separates terms; terms
/// of two chars or fewer and stop words are dropped. Order and repeats are
/// preserved.
///
/// # Examples
///
/// ```
/// use docsift_lens::tokenize::tokenize;
///
/// assert_eq!(tokenize("The Cat-sat on my_mat!"), vec!["cat", "sat", "my_mat"]);
/// assert!(tokenize("a an of").is_empty());
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|term| term.len() > MIN_TERM_LEN && !STOP_WORDS.contains(term))
        .map(str::to_string)
        .collect()
}
