//! Vector-store shaped data: payloads, batched point preparation, and
//! project-level filtering and listing over stored points.
//!
//! Nothing here talks to a store. [`prepare_points`] produces the
//! `(id, vector, payload)` triples to upsert; [`filter_scored`] and
//! [`summarize_projects`] post-process what a store returns.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use docsift_core::{Chunk, ChunkPayload, DocsiftError, FileTypes, ScoredPoint, VectorPoint};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::embedding::EmbeddingProvider;

/// Maximum preview length in chars.
pub const PREVIEW_CHARS: usize = 240;

/// Result count used when a caller asks for zero results.
pub const DEFAULT_TOP_K: usize = 5;

/// Page size used when a caller asks for zero projects.
pub const DEFAULT_PROJECT_PAGE: usize = 50;

const PREFIX_MIN_FETCH: usize = 20;
const PREFIX_FETCH_FACTOR: usize = 5;
const PREFIX_MAX_FETCH: usize = 100;

/// Name of the directory holding `path`.
///
/// Top-level files belong to `root`; an empty path to `unknown`.
///
/// # Examples
///
/// ```
/// use docsift_lens::points::project_from_path;
///
/// assert_eq!(project_from_path("docs/billing/invoices.md"), "billing");
/// assert_eq!(project_from_path("README.md"), "root");
/// assert_eq!(project_from_path("/README.md"), "root");
/// assert_eq!(project_from_path(""), "unknown");
/// ```
pub fn project_from_path(path: &str) -> String {
    if path.is_empty() {
        return "unknown".to_string();
    }
    let parent = Path::new(path).parent().unwrap_or_else(|| Path::new(""));
    let parent_str = parent.to_string_lossy();
    if parent_str.is_empty() || parent_str == "." || parent_str == "/" {
        return "root".to_string();
    }
    parent
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| parent_str.into_owned())
}

/// Trimmed text cut to `max` chars, with `…` appended when cut.
pub fn preview(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(max).collect();
    format!("{head}…")
}

/// Lowercase hex SHA-256 of `text`.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build the store payload describing `chunk`.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsift_core::{Chunk, FileCategory, FileTypes};
/// use docsift_lens::points::payload_for;
///
/// let chunk = Chunk {
///     id: "setup.md:2".into(),
///     path: PathBuf::from("docs/ops/setup.md"),
///     text: "  Install the agent.  ".into(),
///     position: 2,
/// };
/// let payload = payload_for(&chunk, &FileTypes::default());
/// assert_eq!(payload.basename, "setup.md");
/// assert_eq!(payload.project, "ops");
/// assert_eq!(payload.preview, "Install the agent.");
/// assert_eq!(payload.file_type, FileCategory::Documentation);
/// ```
pub fn payload_for(chunk: &Chunk, file_types: &FileTypes) -> ChunkPayload {
    let path = chunk.path.to_string_lossy().into_owned();
    let basename = chunk
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ChunkPayload {
        project: project_from_path(&path),
        file_type: file_types.classify(&chunk.path),
        position: chunk.position,
        basename,
        preview: preview(&chunk.text, PREVIEW_CHARS),
        content_hash: content_hash(&chunk.text),
        path,
    }
}

/// Embed `chunks` in batches of `batch_size` and pair each vector with its
/// id and payload.
///
/// A `batch_size` of 0 is treated as 1.
///
/// # Errors
///
/// Propagates provider errors, and returns [`DocsiftError::Embedding`] when
/// the provider returns the wrong number of vectors for a batch or a vector
/// whose length differs from [`EmbeddingProvider::dim`].
pub fn prepare_points(
    chunks: &[Chunk],
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
    file_types: &FileTypes,
) -> Result<Vec<VectorPoint>, DocsiftError> {
    let batch_size = batch_size.max(1);
    let dim = provider.dim();
    let mut points = Vec::with_capacity(chunks.len());

    for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = provider.embed(&texts)?;
        if vectors.len() != batch.len() {
            return Err(DocsiftError::Embedding(format!(
                "provider returned {} vectors for a batch of {}",
                vectors.len(),
                batch.len()
            )));
        }

        for (chunk, vector) in batch.iter().zip(vectors) {
            if vector.len() != dim {
                return Err(DocsiftError::Embedding(format!(
                    "vector for {} has dimension {}, expected {dim}",
                    chunk.id,
                    vector.len()
                )));
            }
            points.push(VectorPoint {
                id: chunk.id.clone(),
                vector,
                payload: payload_for(chunk, file_types),
            });
        }
        debug!(batch = batch_no, size = batch.len(), total = points.len(), "embedded batch");
    }

    Ok(points)
}

/// Restriction on which project a scored point may come from.
///
/// # Examples
///
/// ```
/// use docsift_lens::points::ProjectFilter;
///
/// let filter = ProjectFilter::new(None, Some("Bill"));
/// assert!(filter.matches("billing"));
/// assert!(!filter.matches("shipping"));
/// assert_eq!(filter.fetch_limit(5), 25);
///
/// let exact = ProjectFilter::new(Some("billing"), Some("ship"));
/// assert_eq!(exact, ProjectFilter::Exact("billing".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProjectFilter {
    #[default]
    Any,
    /// Project name must match exactly.
    Exact(String),
    /// Project name must start with this lowercase prefix.
    Prefix(String),
}

impl ProjectFilter {
    /// Build a filter from optional exact and prefix values. Blank values are
    /// ignored and an exact project takes precedence over a prefix.
    pub fn new(project: Option<&str>, prefix: Option<&str>) -> Self {
        let project = project.map(str::trim).filter(|p| !p.is_empty());
        let prefix = prefix.map(str::trim).filter(|p| !p.is_empty());
        match (project, prefix) {
            (Some(project), _) => Self::Exact(project.to_string()),
            (None, Some(prefix)) => Self::Prefix(prefix.to_lowercase()),
            (None, None) => Self::Any,
        }
    }

    pub fn matches(&self, project: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => project == expected,
            Self::Prefix(prefix) => project.to_lowercase().starts_with(prefix.as_str()),
        }
    }

    /// How many points to request from the store to end up with `k` after
    /// filtering. Prefix filtering happens client-side, so it over-fetches.
    pub fn fetch_limit(&self, k: usize) -> usize {
        let k = normalize_k(k);
        match self {
            Self::Prefix(_) => k
                .max(PREFIX_MIN_FETCH)
                .max(k.saturating_mul(PREFIX_FETCH_FACTOR))
                .min(PREFIX_MAX_FETCH),
            _ => k,
        }
    }
}

fn normalize_k(k: usize) -> usize {
    if k == 0 {
        DEFAULT_TOP_K
    } else {
        k
    }
}

/// Keep the points allowed by `filter`, in store order, up to `k` of them
/// (0 means [`DEFAULT_TOP_K`]).
pub fn filter_scored(points: Vec<ScoredPoint>, filter: &ProjectFilter, k: usize) -> Vec<ScoredPoint> {
    points
        .into_iter()
        .filter(|p| filter.matches(&p.payload.project))
        .take(normalize_k(k))
        .collect()
}

/// Chunk and file counts for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub project: String,
    pub total_chunks: usize,
    pub files: usize,
}

/// One page of [`ProjectSummary`] values plus the filtered total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectPage {
    pub projects: Vec<ProjectSummary>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Group payloads by project (derived from each payload's path), filter by
/// a case-insensitive name prefix, and return the requested page sorted by
/// project name.
///
/// A `limit` of 0 means [`DEFAULT_PROJECT_PAGE`]; an `offset` beyond the
/// total yields an empty page with the total still set.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsift_core::{Chunk, FileTypes};
/// use docsift_lens::points::{payload_for, summarize_projects};
///
/// let payloads: Vec<_> = ["docs/api/a.md", "docs/api/b.md", "docs/web/c.md"]
///     .iter()
///     .map(|p| {
///         let chunk = Chunk { id: p.to_string(), path: PathBuf::from(p), text: "x".into(), position: 0 };
///         payload_for(&chunk, &FileTypes::default())
///     })
///     .collect();
///
/// let page = summarize_projects(&payloads, "", 0, 0);
/// assert_eq!(page.total, 2);
/// assert_eq!(page.projects[0].project, "api");
/// assert_eq!(page.projects[0].files, 2);
/// ```
pub fn summarize_projects<'a, I>(payloads: I, prefix: &str, offset: usize, limit: usize) -> ProjectPage
where
    I: IntoIterator<Item = &'a ChunkPayload>,
{
    let mut grouped: BTreeMap<String, (usize, BTreeSet<&'a str>)> = BTreeMap::new();
    for payload in payloads {
        let entry = grouped.entry(project_from_path(&payload.path)).or_default();
        entry.0 += 1;
        entry.1.insert(payload.basename.as_str());
    }

    let prefix = prefix.trim().to_lowercase();
    let filtered: Vec<ProjectSummary> = grouped
        .into_iter()
        .filter(|(project, _)| project.to_lowercase().starts_with(&prefix))
        .map(|(project, (total_chunks, files))| ProjectSummary {
            project,
            total_chunks,
            files: files.len(),
        })
        .collect();

    let limit = if limit == 0 { DEFAULT_PROJECT_PAGE } else { limit };
    let total = filtered.len();
    let projects = filtered.into_iter().skip(offset).take(limit).collect();

    ProjectPage {
        projects,
        total,
        offset,
        limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_core::FileCategory;
    use std::path::PathBuf;

    fn chunk(path: &str, position: usize, text: &str) -> Chunk {
        let basename = Path::new(path)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        Chunk {
            id: format!("{basename}:{position}"),
            path: PathBuf::from(path),
            text: text.to_string(),
            position,
        }
    }

    /// Returns constant vectors, optionally misbehaving.
    struct FakeProvider {
        dim: usize,
        drop_last: bool,
        short_vectors: bool,
        calls: std::sync::Mutex<Vec<usize>>,
    }

    impl FakeProvider {
        fn new(dim: usize) -> Self {
            Self {
                dim,
                drop_last: false,
                short_vectors: false,
                calls: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    impl EmbeddingProvider for FakeProvider {
        fn dim(&self) -> usize {
            self.dim
        }

        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DocsiftError> {
            self.calls.lock().unwrap().push(texts.len());
            let len = if self.short_vectors { self.dim - 1 } else { self.dim };
            let mut out = vec![vec![0.5; len]; texts.len()];
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        }
    }

    fn scored(id: &str, project: &str) -> ScoredPoint {
        let mut payload = payload_for(&chunk(&format!("docs/{project}/{id}.md"), 0, id), &FileTypes::default());
        payload.project = project.to_string();
        ScoredPoint {
            id: id.to_string(),
            score: 0.5,
            payload,
        }
    }

    #[test]
    fn project_is_parent_directory_name() {
        assert_eq!(project_from_path("a/b/c/file.md"), "c");
        assert_eq!(project_from_path("svc/file.md"), "svc");
        assert_eq!(project_from_path("file.md"), "root");
        assert_eq!(project_from_path("./file.md"), "root");
        assert_eq!(project_from_path(""), "unknown");
    }

    #[test]
    fn preview_trims_and_truncates_on_chars() {
        assert_eq!(preview("  hello  ", 240), "hello");
        assert_eq!(preview("ééééé", 3), "ééé…");
        assert_eq!(preview("abc", 3), "abc");
    }

    #[test]
    fn content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_hash("abc").len(), 64);
    }

    #[test]
    fn payload_carries_chunk_metadata() {
        let c = chunk("docs/infra/deploy.rs", 4, "fn deploy() {}");
        let payload = payload_for(&c, &FileTypes::default());
        assert_eq!(payload.path, "docs/infra/deploy.rs");
        assert_eq!(payload.position, 4);
        assert_eq!(payload.file_type, FileCategory::Code);
        assert_eq!(payload.project, "infra");
        assert_eq!(payload.content_hash, content_hash("fn deploy() {}"));
    }

    #[test]
    fn points_are_embedded_in_batches() {
        let chunks: Vec<Chunk> = (0..7).map(|i| chunk("docs/p/a.md", i, "text")).collect();
        let provider = FakeProvider::new(4);
        let points = prepare_points(&chunks, &provider, 3, &FileTypes::default()).unwrap();

        assert_eq!(points.len(), 7);
        assert_eq!(*provider.calls.lock().unwrap(), vec![3, 3, 1]);
        assert_eq!(points[6].id, "a.md:6");
        assert!(points.iter().all(|p| p.vector.len() == 4));
    }

    #[test]
    fn zero_batch_size_embeds_one_at_a_time() {
        let chunks: Vec<Chunk> = (0..2).map(|i| chunk("a.md", i, "text")).collect();
        let provider = FakeProvider::new(2);
        prepare_points(&chunks, &provider, 0, &FileTypes::default()).unwrap();
        assert_eq!(*provider.calls.lock().unwrap(), vec![1, 1]);
    }

    #[test]
    fn mismatched_vector_count_is_rejected() {
        let chunks = vec![chunk("a.md", 0, "one"), chunk("a.md", 1, "two")];
        let provider = FakeProvider {
            drop_last: true,
            ..FakeProvider::new(3)
        };
        let err = prepare_points(&chunks, &provider, 10, &FileTypes::default()).unwrap_err();
        assert!(matches!(err, DocsiftError::Embedding(_)));
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let chunks = vec![chunk("a.md", 0, "one")];
        let provider = FakeProvider {
            short_vectors: true,
            ..FakeProvider::new(3)
        };
        let err = prepare_points(&chunks, &provider, 10, &FileTypes::default()).unwrap_err();
        assert!(err.to_string().contains("expected 3"), "{err}");
    }

    #[test]
    fn empty_input_makes_no_provider_calls() {
        let provider = FakeProvider::new(3);
        let points = prepare_points(&[], &provider, 10, &FileTypes::default()).unwrap();
        assert!(points.is_empty());
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn filter_construction_prefers_exact() {
        assert_eq!(ProjectFilter::new(None, None), ProjectFilter::Any);
        assert_eq!(ProjectFilter::new(Some("  "), Some(" ")), ProjectFilter::Any);
        assert_eq!(
            ProjectFilter::new(None, Some(" Web")),
            ProjectFilter::Prefix("web".into())
        );
    }

    #[test]
    fn fetch_limit_widens_only_for_prefix() {
        let prefix = ProjectFilter::Prefix("a".into());
        assert_eq!(prefix.fetch_limit(1), 20);
        assert_eq!(prefix.fetch_limit(0), 25);
        assert_eq!(prefix.fetch_limit(10), 50);
        assert_eq!(prefix.fetch_limit(30), 100);
        assert_eq!(ProjectFilter::Any.fetch_limit(0), 5);
        assert_eq!(ProjectFilter::Exact("a".into()).fetch_limit(7), 7);
    }

    #[test]
    fn scored_points_are_filtered_then_truncated() {
        let points = vec![
            scored("one", "Billing"),
            scored("two", "shipping"),
            scored("three", "billing-v2"),
            scored("four", "billing"),
        ];

        let prefixed = filter_scored(points.clone(), &ProjectFilter::new(None, Some("bill")), 2);
        let ids: Vec<&str> = prefixed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["one", "three"]);

        let exact = filter_scored(points.clone(), &ProjectFilter::new(Some("billing"), None), 10);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, "four");

        assert_eq!(filter_scored(points, &ProjectFilter::Any, 0).len(), 4);
    }

    #[test]
    fn projects_are_grouped_sorted_and_paged() {
        let chunks = vec![
            chunk("docs/web/a.md", 0, "x"),
            chunk("docs/web/a.md", 1, "x"),
            chunk("docs/web/b.md", 0, "x"),
            chunk("docs/API/c.md", 0, "x"),
            chunk("docs/apps/d.md", 0, "x"),
            chunk("top.md", 0, "x"),
        ];
        let payloads: Vec<ChunkPayload> = chunks
            .iter()
            .map(|c| payload_for(c, &FileTypes::default()))
            .collect();

        let all = summarize_projects(&payloads, "", 0, 0);
        let names: Vec<&str> = all.projects.iter().map(|p| p.project.as_str()).collect();
        assert_eq!(names, vec!["API", "apps", "root", "web"]);
        assert_eq!(all.total, 4);
        assert_eq!(all.limit, 50);
        assert_eq!(
            all.projects[3],
            ProjectSummary {
                project: "web".into(),
                total_chunks: 3,
                files: 2
            }
        );

        let ap = summarize_projects(&payloads, "aP", 0, 10);
        let names: Vec<&str> = ap.projects.iter().map(|p| p.project.as_str()).collect();
        assert_eq!(names, vec!["API", "apps"]);

        let page = summarize_projects(&payloads, "", 1, 2);
        assert_eq!(page.projects.len(), 2);
        assert_eq!(page.projects[0].project, "apps");
        assert_eq!(page.total, 4);

        let past_end = summarize_projects(&payloads, "", 9, 2);
        assert!(past_end.projects.is_empty());
        assert_eq!(past_end.total, 4);
    }
}
