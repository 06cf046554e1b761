use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A window of a source document's text, ready for embedding or indexing.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsift_core::Chunk;
///
/// let chunk = Chunk {
///     id: "guide.md:0".into(),
///     path: PathBuf::from("docs/guide.md"),
///     text: "Install the service".into(),
///     position: 0,
/// };
/// assert_eq!(chunk.id, "guide.md:0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// `basename:index`, deterministic for a given file and window.
    pub id: String,
    /// Path of the source file as discovered under the walk root.
    pub path: PathBuf,
    /// Window text.
    pub text: String,
    /// Window index within the source file (0-based).
    pub position: usize,
}

/// A ranked lexical match produced by the hybrid scorer.
///
/// # Examples
///
/// ```
/// use docsift_core::Hit;
///
/// let hit = Hit {
///     id: "guide.md:3".into(),
///     score: 1.25,
///     snippet: "run **docker** compose".into(),
/// };
/// assert!(hit.snippet.contains("**docker**"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    /// Id of the matched chunk.
    pub id: String,
    /// Blended BM25/cosine score, higher is better.
    pub score: f64,
    /// Highlighted excerpt of the chunk text.
    pub snippet: String,
}

/// Category a file belongs to, derived from its extension.
///
/// # Examples
///
/// ```
/// use docsift_core::FileCategory;
///
/// assert_eq!(FileCategory::Documentation.to_string(), "documentation");
/// let c: FileCategory = serde_json::from_str("\"code\"").unwrap();
/// assert_eq!(c, FileCategory::Code);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    /// Prose documents, always indexed.
    Documentation,
    /// Source code, indexed only on request.
    Code,
    /// Configuration files.
    Config,
    /// SQL and schema files.
    Database,
    /// Markup and stylesheets.
    Web,
    /// Anything else.
    Other,
}

impl FileCategory {
    /// Lowercase name used in payloads and output.
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Documentation => "documentation",
            FileCategory::Code => "code",
            FileCategory::Config => "config",
            FileCategory::Database => "database",
            FileCategory::Web => "web",
            FileCategory::Other => "other",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata stored next to each vector in an external vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Source file path.
    pub path: String,
    /// Window index within the source file.
    pub position: usize,
    /// File name component of `path`.
    pub basename: String,
    /// Trimmed, truncated chunk text for display.
    pub preview: String,
    /// Category of the source file.
    pub file_type: FileCategory,
    /// Name of the directory containing the file.
    pub project: String,
    /// SHA-256 of the chunk text, for dedup.
    pub content_hash: String,
}

/// An `(id, vector, payload)` triple ready for upsert into a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// An `(id, score, payload)` triple returned by a vector store similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: ChunkPayload,
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use docsift_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable listings.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
