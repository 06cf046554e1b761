//! Overlapping fixed-size windows over document text.
//!
//! Windows are measured in chars, not bytes, so multi-byte text is never
//! split inside a code point.

use std::ops::Range;
use std::path::Path;

use docsift_core::{Chunk, DocsiftError, FileTypes, IndexingConfig};
use tracing::info;

use crate::walker::{walk_docs, SourceFile};

/// Window size used when a non-positive size is requested.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Walk and chunking parameters.
///
/// # Examples
///
/// ```
/// use docsift_core::IndexingConfig;
/// use docsift_chunker::ChunkOptions;
///
/// let mut config = IndexingConfig::default();
/// config.include_code = true;
/// let options = ChunkOptions::from(&config);
/// assert!(options.include_code);
/// assert_eq!(options.chunk_size, 800);
/// ```
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Window size in chars; `<= 0` means [`DEFAULT_CHUNK_SIZE`].
    pub chunk_size: i64,
    /// Chars shared by consecutive windows; negative means 0.
    pub chunk_overlap: i64,
    /// Also chunk files in the code category.
    pub include_code: bool,
    /// Size guard in KB; 0 disables it.
    pub max_file_kb: u64,
    /// Directory names pruned from the walk.
    pub exclude_dirs: Vec<String>,
    /// Follow symbolic links (targets must still resolve under the root).
    pub follow_symlinks: bool,
    /// Extension tables used to categorize files.
    pub file_types: FileTypes,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self::from(&IndexingConfig::default())
    }
}

impl From<&IndexingConfig> for ChunkOptions {
    fn from(config: &IndexingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            include_code: config.include_code,
            max_file_kb: config.max_file_kb,
            exclude_dirs: config.exclude_dirs.clone(),
            follow_symlinks: config.follow_symlinks,
            file_types: config.file_types.clone(),
        }
    }
}

/// Compute the char ranges of the windows covering `len` chars.
///
/// Each window spans `size` chars (the last may be shorter) and starts
/// `size - overlap` chars after the previous one. Overlap is bounded to
/// `size - 1` so the start always moves forward.
///
/// # Examples
///
/// ```
/// use docsift_chunker::chunk_ranges;
///
/// assert_eq!(chunk_ranges(25, 10, 3), vec![0..10, 7..17, 14..24, 21..25]);
/// assert!(chunk_ranges(0, 10, 3).is_empty());
/// ```
pub fn chunk_ranges(len: usize, size: i64, overlap: i64) -> Vec<Range<usize>> {
    let size = usize::try_from(size)
        .ok()
        .filter(|&s| s > 0)
        .unwrap_or(DEFAULT_CHUNK_SIZE);
    let overlap = usize::try_from(overlap).unwrap_or(0).min(size - 1);

    let mut ranges = Vec::new();
    let mut start = 0;
    while start < len {
        let end = start.saturating_add(size).min(len);
        ranges.push(start..end);
        if end == len {
            break;
        }
        start = end - overlap;
    }
    ranges
}

/// Split `text` into overlapping windows of `size` chars.
///
/// Empty text yields no windows; every returned window is non-empty.
///
/// # Examples
///
/// ```
/// use docsift_chunker::chunk_text;
///
/// let windows = chunk_text("abcdefghij", 4, 1);
/// assert_eq!(windows, vec!["abcd", "defg", "ghij"]);
/// ```
pub fn chunk_text(text: &str, size: i64, overlap: i64) -> Vec<String> {
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;

    chunk_ranges(char_count, size, overlap)
        .into_iter()
        .map(|r| text[bounds[r.start]..bounds[r.end]].to_string())
        .collect()
}

/// Turn already-loaded source files into chunks with `basename:index` ids.
pub fn chunk_files(files: &[SourceFile], size: i64, overlap: i64) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for file in files {
        let basename = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for (position, text) in chunk_text(&file.content, size, overlap)
            .into_iter()
            .enumerate()
        {
            chunks.push(Chunk {
                id: format!("{basename}:{position}"),
                path: file.path.clone(),
                text,
                position,
            });
        }
    }
    chunks
}

/// Walk `root` and chunk every selected file.
///
/// # Errors
///
/// Propagates walk and read failures from [`walk_docs`].
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use docsift_chunker::{chunk_dir, ChunkOptions};
///
/// let chunks = chunk_dir(Path::new("./docs"), &ChunkOptions::default()).unwrap();
/// println!("{} chunks", chunks.len());
/// ```
pub fn chunk_dir(root: &Path, options: &ChunkOptions) -> Result<Vec<Chunk>, DocsiftError> {
    let files = walk_docs(root, options)?;
    let chunks = chunk_files(&files, options.chunk_size, options.chunk_overlap);
    info!(
        root = %root.display(),
        files = files.len(),
        chunks = chunks.len(),
        "chunked directory"
    );
    Ok(chunks)
}
