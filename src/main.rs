use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use docsift_chunker::{chunk_dir, ChunkOptions};
use docsift_core::{Chunk, ChunkPayload, DocsiftConfig, OutputFormat};
use docsift_lens::points::{payload_for, summarize_projects};
use docsift_lens::{Engine, IndexStats};

#[derive(Parser)]
#[command(
    name = "docsift",
    version,
    about = "Local document retrieval: chunking, TF-IDF embeddings and hybrid search",
    long_about = "docsift splits a documentation tree into overlapping windows, embeds them\n\
                   without a remote model, and ranks them with a BM25/cosine hybrid scorer.\n\n\
                   Examples:\n  \
                     docsift search 'rotate api keys'       Rank chunks under ./docs\n  \
                     docsift chunk --dir notes --size 400   List the windows of a tree\n  \
                     docsift embed --query 'backup policy'  Print a query vector\n  \
                     docsift projects --prefix api          Chunk counts per project\n  \
                     docsift init                           Create a .docsift.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .docsift.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Flags shared by every command that reads the docs tree.
#[derive(clap::Args)]
struct CorpusArgs {
    /// Documents directory (overrides [indexing] docs_dir)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Also index source code files
    #[arg(long)]
    include_code: bool,

    /// Window size in chars
    #[arg(long, allow_negative_numbers = true)]
    size: Option<i64>,

    /// Chars shared by consecutive windows
    #[arg(long, allow_negative_numbers = true)]
    overlap: Option<i64>,
}

#[derive(Subcommand)]
enum Command {
    /// Split the docs tree into overlapping windows
    Chunk {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Rank chunks against a query with BM25 + cosine
    #[command(long_about = "Rank chunks against a query with BM25 + cosine.\n\n\
        Only chunks sharing at least one query term are scored. Matches are\n\
        wrapped in ** in the snippet.\n\n\
        Examples:\n  docsift search 'docker compose'\n  docsift search tls --limit 10 --format json")]
    Search {
        /// Search query
        query: String,

        #[command(flatten)]
        corpus: CorpusArgs,

        /// Maximum number of hits (default: [search] limit)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Embed a query, or every chunk as vector-store points
    Embed {
        /// Text to embed against the corpus vocabulary; omit to emit all points
        #[arg(long)]
        query: Option<String>,

        #[command(flatten)]
        corpus: CorpusArgs,

        /// Vector dimension (default: [embedding] dim)
        #[arg(long)]
        dim: Option<usize>,
    },
    /// Show index statistics for the docs tree
    Stats {
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// List projects (parent directory names) with chunk and file counts
    Projects {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Case-insensitive project name prefix
        #[arg(long, default_value = "")]
        prefix: String,

        /// Projects to skip
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Page size (0 = 50)
        #[arg(long, default_value = "0")]
        limit: usize,
    },
    /// Create a default .docsift.toml configuration file
    #[command(long_about = "Create a default .docsift.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .docsift.toml already exists.")]
    Init,
}

const DEFAULT_CONFIG: &str = r#"# docsift configuration

[indexing]
# docs_dir = "./docs"
# chunk_size = 800
# chunk_overlap = 100
# batch_size = 10
# include_code = false
# max_file_kb = 0          # 0 disables the size guard
# exclude_dirs = [".git", "node_modules", "target", "vendor", "dist", "build"]
# follow_symlinks = false

[indexing.file_types]
# documentation = [".md", ".txt", ".rst", ".adoc"]
# code = [".go", ".py", ".js", ".ts", ".rs"]

[embedding]
# provider = "local"
# dim = 300

[search]
# limit = 5
# snippet_chars = 220

[logging]
# level = "info"           # overridden by RUST_LOG or --verbose
"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport {
    root: PathBuf,
    chunks: usize,
    files: usize,
    #[serde(flatten)]
    index: IndexStats,
}

fn load_config(cli: &Cli) -> Result<DocsiftConfig> {
    let mut config = match &cli.config {
        Some(path) => DocsiftConfig::from_file(path).into_diagnostic()?,
        None => {
            let default_path = Path::new(".docsift.toml");
            if default_path.exists() {
                DocsiftConfig::from_file(default_path).into_diagnostic()?
            } else {
                DocsiftConfig::default()
            }
        }
    };
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

fn init_tracing(level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Apply corpus flags on top of the loaded config.
fn apply_corpus_args(config: &mut DocsiftConfig, corpus: &CorpusArgs) {
    if let Some(dir) = &corpus.dir {
        config.indexing.docs_dir = dir.clone();
    }
    if corpus.include_code {
        config.indexing.include_code = true;
    }
    if let Some(size) = corpus.size {
        config.indexing.chunk_size = size;
    }
    if let Some(overlap) = corpus.overlap {
        config.indexing.chunk_overlap = overlap;
    }
}

fn load_chunks(config: &DocsiftConfig) -> Result<Vec<Chunk>> {
    let root = &config.indexing.docs_dir;
    if !root.exists() {
        miette::bail!(miette::miette!(
            help = "Pass --dir, set DOCS_DIR, or set docs_dir under [indexing] in .docsift.toml",
            "Documents directory not found: {}",
            root.display()
        ));
    }
    let options = ChunkOptions::from(&config.indexing);
    chunk_dir(root, &options).into_diagnostic()
}

fn build_engine(config: &DocsiftConfig, chunks: Vec<Chunk>) -> Engine {
    Engine::build(chunks, config.embedding.dim).with_snippet_chars(config.search.snippet_chars)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    init_tracing(&config.logging.level, cli.verbose);
    debug!(format = %cli.format, "configuration loaded");

    match &cli.command {
        Command::Chunk { corpus } => {
            apply_corpus_args(&mut config, corpus);
            config.validate().into_diagnostic()?;
            let chunks = load_chunks(&config)?;

            match cli.format {
                OutputFormat::Json => print_json(&chunks)?,
                OutputFormat::Text => {
                    if chunks.is_empty() {
                        println!("No chunks produced.");
                    }
                    for chunk in &chunks {
                        println!(
                            "{}\t{}\t{} chars",
                            chunk.id,
                            chunk.path.display(),
                            chunk.text.chars().count()
                        );
                    }
                }
            }
        }
        Command::Search {
            query,
            corpus,
            limit,
        } => {
            apply_corpus_args(&mut config, corpus);
            if let Some(limit) = limit {
                config.search.limit = *limit;
            }
            config.validate().into_diagnostic()?;

            let chunks = load_chunks(&config)?;
            let engine = build_engine(&config, chunks);
            let hits = engine.search(query, config.search.limit);

            match cli.format {
                OutputFormat::Json => print_json(&hits)?,
                OutputFormat::Text => {
                    if hits.is_empty() {
                        println!("No results found.");
                    }
                    for (i, hit) in hits.iter().enumerate() {
                        println!("{}. {} (score: {:.4})", i + 1, hit.id, hit.score);
                        for line in hit.snippet.lines().take(3) {
                            println!("   {line}");
                        }
                        println!();
                    }
                }
            }
        }
        Command::Embed { query, corpus, dim } => {
            apply_corpus_args(&mut config, corpus);
            if let Some(dim) = dim {
                config.embedding.dim = *dim;
            }
            config.validate().into_diagnostic()?;
            if config.embedding.provider != "local" {
                miette::bail!(miette::miette!(
                    help = "Set provider = \"local\" under [embedding]; remote providers are not built in",
                    "Unsupported embedding provider '{}'",
                    config.embedding.provider
                ));
            }

            let chunks = load_chunks(&config)?;
            let engine = build_engine(&config, chunks);

            match query {
                Some(text) => {
                    let vector = engine.embed_query(text).into_diagnostic()?;
                    match cli.format {
                        OutputFormat::Json => print_json(&vector)?,
                        OutputFormat::Text => {
                            let nonzero = vector.iter().filter(|v| **v != 0.0).count();
                            println!(
                                "dim {} over a vocabulary of {} terms, {nonzero} non-zero buckets",
                                vector.len(),
                                engine.vocabulary().len()
                            );
                            for (bucket, value) in vector.iter().enumerate().filter(|(_, v)| **v != 0.0) {
                                println!("  [{bucket}] {value:.6}");
                            }
                        }
                    }
                }
                None => {
                    let points = engine
                        .points(config.indexing.batch_size, &config.indexing.file_types)
                        .into_diagnostic()?;
                    match cli.format {
                        OutputFormat::Json => print_json(&points)?,
                        OutputFormat::Text => {
                            for point in &points {
                                println!(
                                    "{}\t{}\t{}\t{}",
                                    point.id,
                                    point.payload.project,
                                    point.payload.file_type,
                                    &point.payload.content_hash[..12]
                                );
                            }
                            println!("{} points of dimension {}", points.len(), config.embedding.dim);
                        }
                    }
                }
            }
        }
        Command::Stats { corpus } => {
            apply_corpus_args(&mut config, corpus);
            config.validate().into_diagnostic()?;

            let chunks = load_chunks(&config)?;
            let files = chunks
                .iter()
                .map(|c| c.path.as_path())
                .collect::<std::collections::BTreeSet<_>>()
                .len();
            let chunk_count = chunks.len();
            let engine = build_engine(&config, chunks);
            let report = StatsReport {
                root: config.indexing.docs_dir.clone(),
                chunks: chunk_count,
                files,
                index: engine.stats(),
            };

            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Text => {
                    println!("Root:             {}", report.root.display());
                    println!("Files:            {}", report.files);
                    println!("Chunks:           {}", report.chunks);
                    println!("Vocabulary:       {}", report.index.vocabulary_size);
                    println!("Avg chunk terms:  {:.2}", report.index.avg_doc_len);
                }
            }
        }
        Command::Projects {
            corpus,
            prefix,
            offset,
            limit,
        } => {
            apply_corpus_args(&mut config, corpus);
            config.validate().into_diagnostic()?;

            let chunks = load_chunks(&config)?;
            let payloads: Vec<ChunkPayload> = chunks
                .iter()
                .map(|c| payload_for(c, &config.indexing.file_types))
                .collect();
            let page = summarize_projects(&payloads, prefix, *offset, *limit);

            match cli.format {
                OutputFormat::Json => print_json(&page)?,
                OutputFormat::Text => {
                    if page.projects.is_empty() {
                        println!("No projects found.");
                    }
                    for p in &page.projects {
                        println!(
                            "{:<24} {:>6} chunks {:>4} files",
                            p.project, p.total_chunks, p.files
                        );
                    }
                    println!(
                        "\nShowing {} of {} projects (offset {})",
                        page.projects.len(),
                        page.total,
                        page.offset
                    );
                }
            }
        }
        Command::Init => {
            let path = Path::new(".docsift.toml");
            if path.exists() {
                miette::bail!(".docsift.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .docsift.toml with default configuration");
        }
    }

    Ok(())
}
