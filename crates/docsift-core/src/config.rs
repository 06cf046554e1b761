use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DocsiftError;
use crate::types::FileCategory;

/// Embedding provider names accepted in `[embedding] provider`.
const KNOWN_PROVIDERS: &[&str] = &["local", "openai"];

/// Top-level configuration loaded from `.docsift.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use docsift_core::DocsiftConfig;
///
/// let config = DocsiftConfig::default();
/// assert_eq!(config.indexing.chunk_size, 800);
/// assert_eq!(config.embedding.dim, 300);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocsiftConfig {
    /// Directory walking and chunking.
    #[serde(default)]
    pub indexing: IndexingConfig,
    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Lexical search settings.
    #[serde(default)]
    pub search: SearchConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DocsiftConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DocsiftError::Io`] if the file cannot be read, or
    /// [`DocsiftError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, DocsiftError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`DocsiftError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use docsift_core::DocsiftConfig;
    ///
    /// let toml = r#"
    /// [indexing]
    /// chunk_size = 400
    /// include_code = true
    /// "#;
    /// let config = DocsiftConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.indexing.chunk_size, 400);
    /// assert!(config.indexing.include_code);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, DocsiftError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Override fields from environment variables.
    ///
    /// Reads `DOCS_DIR`, `EMBEDDING_PROVIDER` and `LOG_LEVEL` through
    /// `lookup`; empty values are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use docsift_core::DocsiftConfig;
    ///
    /// let mut config = DocsiftConfig::default();
    /// config.apply_env(|key| match key {
    ///     "LOG_LEVEL" => Some("debug".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("DOCS_DIR") {
            self.indexing.docs_dir = PathBuf::from(dir);
        }
        if let Some(provider) = get("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Check values that cannot be defaulted silently.
    ///
    /// Chunk size and overlap are not checked; the chunker corrects them at
    /// the call site.
    ///
    /// # Errors
    ///
    /// Returns [`DocsiftError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), DocsiftError> {
        if !KNOWN_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(DocsiftError::Config(format!(
                "embedding provider must be one of {KNOWN_PROVIDERS:?}, got '{}'",
                self.embedding.provider
            )));
        }
        if self.embedding.dim == 0 {
            return Err(DocsiftError::Config(
                "embedding dim must be positive".into(),
            ));
        }
        if self.indexing.batch_size == 0 {
            return Err(DocsiftError::Config("batch size must be positive".into()));
        }
        if self.search.limit == 0 {
            return Err(DocsiftError::Config("search limit must be positive".into()));
        }
        Ok(())
    }
}

/// Directory walking and chunking configuration.
///
/// # Examples
///
/// ```
/// use docsift_core::IndexingConfig;
///
/// let config = IndexingConfig::default();
/// assert_eq!(config.chunk_overlap, 100);
/// assert!(!config.include_code);
/// assert!(config.exclude_dirs.contains(&"node_modules".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Root directory to index (default: `./docs`).
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
    /// Window size in characters (default: 800).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: i64,
    /// Characters shared by consecutive windows (default: 100).
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: i64,
    /// Texts per embedding call when preparing vector-store points (default: 10).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Also index code files (default: false).
    #[serde(default)]
    pub include_code: bool,
    /// Skip files larger than this many KB; 0 disables the guard.
    #[serde(default)]
    pub max_file_kb: u64,
    /// Directory names that are never descended into.
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
    /// Follow symbolic links during the walk (default: false).
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Extension tables used to categorize files.
    #[serde(default)]
    pub file_types: FileTypes,
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("./docs")
}

fn default_chunk_size() -> i64 {
    800
}

fn default_chunk_overlap() -> i64 {
    100
}

fn default_batch_size() -> usize {
    10
}

fn default_exclude_dirs() -> Vec<String> {
    [".git", "node_modules", "target", "vendor", "dist", "build"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            batch_size: default_batch_size(),
            include_code: false,
            max_file_kb: 0,
            exclude_dirs: default_exclude_dirs(),
            follow_symlinks: false,
            file_types: FileTypes::default(),
        }
    }
}

/// Extension lists per file category. Entries may be written with or
/// without the leading dot and are matched case-insensitively.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use docsift_core::{FileCategory, FileTypes};
///
/// let types = FileTypes::default();
/// assert_eq!(types.classify(Path::new("README.MD")), FileCategory::Documentation);
/// assert_eq!(types.classify(Path::new("src/main.rs")), FileCategory::Code);
/// assert_eq!(types.classify(Path::new("Makefile")), FileCategory::Other);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTypes {
    #[serde(default = "default_documentation")]
    pub documentation: Vec<String>,
    #[serde(default = "default_code")]
    pub code: Vec<String>,
    #[serde(default = "default_config_exts")]
    pub config: Vec<String>,
    #[serde(default = "default_database")]
    pub database: Vec<String>,
    #[serde(default = "default_web")]
    pub web: Vec<String>,
}

fn to_strings(exts: &[&str]) -> Vec<String> {
    exts.iter().map(|s| s.to_string()).collect()
}

fn default_documentation() -> Vec<String> {
    to_strings(&[".md", ".txt", ".rst", ".adoc"])
}

fn default_code() -> Vec<String> {
    to_strings(&[
        ".go", ".py", ".js", ".ts", ".java", ".cpp", ".c", ".h", ".cs", ".php", ".rb", ".rs",
        ".scala", ".kt", ".swift", ".dart", ".r", ".m", ".sh", ".bat", ".ps1",
    ])
}

fn default_config_exts() -> Vec<String> {
    to_strings(&[
        ".json", ".yaml", ".yml", ".xml", ".toml", ".ini", ".cfg", ".conf",
    ])
}

fn default_database() -> Vec<String> {
    to_strings(&[".sql", ".ddl", ".dml"])
}

fn default_web() -> Vec<String> {
    to_strings(&[
        ".html", ".css", ".scss", ".less", ".jsx", ".tsx", ".vue", ".svelte",
    ])
}

impl Default for FileTypes {
    fn default() -> Self {
        Self {
            documentation: default_documentation(),
            code: default_code(),
            config: default_config_exts(),
            database: default_database(),
            web: default_web(),
        }
    }
}

impl FileTypes {
    /// Categorize `path` by its extension. Documentation wins over code when
    /// an extension appears in both lists.
    pub fn classify(&self, path: &Path) -> FileCategory {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return FileCategory::Other;
        };
        let ext = ext.to_lowercase();

        let tables = [
            (&self.documentation, FileCategory::Documentation),
            (&self.code, FileCategory::Code),
            (&self.config, FileCategory::Config),
            (&self.database, FileCategory::Database),
            (&self.web, FileCategory::Web),
        ];
        tables
            .into_iter()
            .find(|(list, _)| list.iter().any(|e| matches_ext(e, &ext)))
            .map_or(FileCategory::Other, |(_, category)| category)
    }
}

fn matches_ext(configured: &str, ext: &str) -> bool {
    configured.trim_start_matches('.').eq_ignore_ascii_case(ext)
}

/// Embedding provider configuration.
///
/// # Examples
///
/// ```
/// use docsift_core::EmbeddingConfig;
///
/// let config = EmbeddingConfig::default();
/// assert_eq!(config.provider, "local");
/// assert_eq!(config.dim, 300);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name (default: `"local"`).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Output vector dimension for the local provider (default: 300).
    #[serde(default = "default_dim")]
    pub dim: usize,
}

fn default_provider() -> String {
    "local".into()
}

fn default_dim() -> usize {
    300
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            dim: default_dim(),
        }
    }
}

/// Lexical search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of hits (default: 5).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Snippet window in characters (default: 220).
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

fn default_limit() -> usize {
    5
}

fn default_snippet_chars() -> usize {
    220
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset (default: `info`).
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}
