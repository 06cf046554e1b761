use std::collections::HashSet;
use std::path::{Path, PathBuf};

use docsift_core::{DocsiftError, FileCategory};
use tracing::debug;

use crate::chunker::ChunkOptions;

/// A document discovered during the walk, with its full text.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use docsift_core::FileCategory;
/// use docsift_chunker::SourceFile;
///
/// let file = SourceFile {
///     path: PathBuf::from("docs/intro.md"),
///     category: FileCategory::Documentation,
///     content: "# Intro".to_string(),
/// };
/// assert_eq!(file.category, FileCategory::Documentation);
/// ```
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path as reached from the walk root (root-prefixed).
    pub path: PathBuf,
    /// Category assigned from the extension tables.
    pub category: FileCategory,
    /// Full file content. Invalid UTF-8 is replaced, not rejected.
    pub content: String,
}

/// Walk `root` and return every file selected by `options`, in lexical
/// path order.
///
/// - directories named in `exclude_dirs` are pruned, not descended;
/// - symlinks are skipped unless `follow_symlinks` is set; followed links
///   that resolve outside `root` are pruned or skipped, and links looping
///   back to an ancestor are skipped;
/// - documentation files are always kept, code files only with
///   `include_code`, every other category is skipped;
/// - files above the `max_file_kb` guard are skipped silently.
///
/// # Errors
///
/// Returns [`DocsiftError::FileNotFound`] if `root` does not exist,
/// [`DocsiftError::Walk`] if a directory entry cannot be read, and
/// [`DocsiftError::Io`] if a selected file cannot be read.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use docsift_chunker::{walk_docs, ChunkOptions};
///
/// let files = walk_docs(Path::new("./docs"), &ChunkOptions::default()).unwrap();
/// for f in &files {
///     println!("{} ({})", f.path.display(), f.category);
/// }
/// ```
pub fn walk_docs(root: &Path, options: &ChunkOptions) -> Result<Vec<SourceFile>, DocsiftError> {
    if !root.exists() {
        return Err(DocsiftError::FileNotFound(root.to_path_buf()));
    }
    let root_resolved = root.canonicalize()?;

    let excluded: HashSet<String> = options.exclude_dirs.iter().cloned().collect();
    let filter_root = root_resolved.clone();
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if !is_dir {
                return true;
            }
            let excluded_name = entry
                .file_name()
                .to_str()
                .is_some_and(|name| excluded.contains(name));
            if excluded_name {
                return false;
            }
            // Followed directory links are never descended outside the root.
            if entry.path_is_symlink() {
                return entry
                    .path()
                    .canonicalize()
                    .is_ok_and(|target| target.starts_with(&filter_root));
            }
            true
        })
        .build();

    let max_bytes = options.max_file_kb.saturating_mul(1024);
    let mut files = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if is_loop(&err) => {
                debug!(error = %err, "skipping symlink loop");
                continue;
            }
            Err(err) => return Err(DocsiftError::Walk(err.to_string())),
        };

        // Without follow_symlinks a link reports its own type and never passes this.
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        if entry.path_is_symlink() && !options.follow_symlinks {
            continue;
        }

        let resolved = path.canonicalize()?;
        if !resolved.starts_with(&root_resolved) {
            debug!(path = %path.display(), "skipping file outside walk root");
            continue;
        }

        let category = options.file_types.classify(path);
        let selected = match category {
            FileCategory::Documentation => true,
            FileCategory::Code => options.include_code,
            _ => false,
        };
        if !selected {
            continue;
        }

        let size = std::fs::metadata(path)?.len();
        if max_bytes > 0 && size > max_bytes {
            debug!(path = %path.display(), size, "skipping file above size guard");
            continue;
        }

        let bytes = std::fs::read(path)?;
        let content = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        if category == FileCategory::Code && content.is_empty() {
            continue;
        }

        files.push(SourceFile {
            path: path.to_path_buf(),
            category,
            content,
        });
    }

    Ok(files)
}

/// Whether `err` is a followed link pointing back at one of its ancestors.
fn is_loop(err: &ignore::Error) -> bool {
    match err {
        ignore::Error::Loop { .. } => true,
        ignore::Error::WithPath { err, .. }
        | ignore::Error::WithDepth { err, .. }
        | ignore::Error::WithLineNumber { err, .. } => is_loop(err),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_temp_docs() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("guides")).unwrap();
        fs::write(root.join("README.md"), "# Readme").unwrap();
        fs::write(root.join("guides/install.txt"), "install steps").unwrap();
        fs::write(root.join("guides/api.rst"), "api reference").unwrap();
        fs::write(root.join("main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("settings.yaml"), "a: 1").unwrap();
        fs::write(root.join("logo.png"), [0u8, 1, 2]).unwrap();

        dir
    }

    fn names(files: &[SourceFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn documentation_only_by_default() {
        let dir = make_temp_docs();
        let files = walk_docs(dir.path(), &ChunkOptions::default()).unwrap();
        assert_eq!(names(&files), vec!["README.md", "api.rst", "install.txt"]);
        assert!(files
            .iter()
            .all(|f| f.category == FileCategory::Documentation));
    }

    #[test]
    fn code_included_when_requested() {
        let dir = make_temp_docs();
        let options = ChunkOptions {
            include_code: true,
            ..ChunkOptions::default()
        };
        let files = walk_docs(dir.path(), &options).unwrap();
        let found = names(&files);
        assert!(found.contains(&"main.rs".to_string()), "{found:?}");
        assert!(!found.contains(&"settings.yaml".to_string()), "{found:?}");
        assert!(!found.contains(&"logo.png".to_string()), "{found:?}");
    }

    #[test]
    fn excluded_directories_are_pruned() {
        let dir = make_temp_docs();
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("node_modules/pkg/README.md"), "vendored").unwrap();
        fs::create_dir_all(root.join("archive")).unwrap();
        fs::write(root.join("archive/old.md"), "old").unwrap();

        let options = ChunkOptions {
            exclude_dirs: vec!["node_modules".into(), "archive".into()],
            ..ChunkOptions::default()
        };
        let files = walk_docs(root, &options).unwrap();
        for f in &files {
            assert!(!f.path.starts_with(root.join("node_modules")));
            assert!(!f.path.starts_with(root.join("archive")));
        }
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn size_guard_skips_large_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("big.md"), "x".repeat(2 * 1024 + 1)).unwrap();
        fs::write(root.join("small.md"), "ok").unwrap();

        let options = ChunkOptions {
            max_file_kb: 2,
            ..ChunkOptions::default()
        };
        let files = walk_docs(root, &options).unwrap();
        assert_eq!(names(&files), vec!["small.md"]);

        let unguarded = walk_docs(root, &ChunkOptions::default()).unwrap();
        assert_eq!(unguarded.len(), 2);
    }

    #[test]
    fn empty_code_files_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty.py"), "").unwrap();
        let options = ChunkOptions {
            include_code: true,
            ..ChunkOptions::default()
        };
        let files = walk_docs(dir.path(), &options).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("latin1.txt"), [b'c', b'a', b'f', 0xE9]).unwrap();
        let files = walk_docs(dir.path(), &ChunkOptions::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].content.starts_with("caf"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = walk_docs(&missing, &ChunkOptions::default()).unwrap_err();
        assert!(matches!(err, DocsiftError::FileNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_skipped_unless_followed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("real.md"), "real").unwrap();
        std::os::unix::fs::symlink(root.join("real.md"), root.join("alias.md")).unwrap();

        let files = walk_docs(root, &ChunkOptions::default()).unwrap();
        assert_eq!(names(&files), vec!["real.md"]);

        let options = ChunkOptions {
            follow_symlinks: true,
            ..ChunkOptions::default()
        };
        let files = walk_docs(root, &options).unwrap();
        assert_eq!(names(&files), vec!["alias.md", "real.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn followed_symlinks_must_stay_under_root() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.md"), "secret").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("inside.md"), "inside").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.md"), root.join("leak.md"))
            .unwrap();

        let options = ChunkOptions {
            follow_symlinks: true,
            ..ChunkOptions::default()
        };
        let files = walk_docs(root, &options).unwrap();
        assert_eq!(names(&files), vec!["inside.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn followed_ancestor_loop_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/a.md"), "alpha").unwrap();
        std::os::unix::fs::symlink("..", root.join("sub/up")).unwrap();

        let options = ChunkOptions {
            follow_symlinks: true,
            ..ChunkOptions::default()
        };
        let files = walk_docs(root, &options).unwrap();
        assert_eq!(names(&files), vec!["a.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn followed_directory_outside_root_is_not_descended() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.md"), "secret").unwrap();
        // Walking into this tree would surface the dangling link as an error.
        std::os::unix::fs::symlink(
            outside.path().join("does-not-exist"),
            outside.path().join("broken.md"),
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("inside.md"), "inside").unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("ext")).unwrap();

        let options = ChunkOptions {
            follow_symlinks: true,
            ..ChunkOptions::default()
        };
        let files = walk_docs(root, &options).unwrap();
        assert_eq!(names(&files), vec!["inside.md"]);
    }
}
