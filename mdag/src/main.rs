mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mdag_core::{Algorithm, CompressionType, DagReader, FsStore, Hash, NodeKind, RootRef, list};
use output::{
    AddOutput, AddedObject, InitOutput, LsOutput, OutputWriter, RefInfo, ReferenceCreated,
    RefsAddOutput, RefsListOutput, RefsRmOutput,
};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// mdag - a content-addressed Merkle DAG store
#[derive(Parser)]
#[command(name = "mdag")]
#[command(about = "Content-addressed Merkle DAG store with chunked files", long_about = None)]
#[command(version)]
struct Cli {
    /// Store root directory (defaults to MDAG_ROOT env var or ./mdag-store)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Print structured JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new store
    Init {
        /// Hash algorithm to use
        #[arg(long, default_value = "blake3")]
        algo: String,

        /// Compression for stored values (zstd or none)
        #[arg(long, default_value = "zstd")]
        compression: String,
    },

    /// Add files or directories to the store
    Add {
        /// Paths to add
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Point a reference at the added root
        #[arg(long)]
        ref_name: Option<String>,
    },

    /// Write the file at a path under a directory root to stdout
    Cat {
        /// Root hash or reference name
        root: String,

        /// Slash-separated path inside the root
        path: String,
    },

    /// Write a file root to stdout
    CatFile {
        /// Hash of the file root
        hash: String,

        /// How the root is stored (blob or list)
        #[arg(long, default_value = "blob")]
        kind: String,
    },

    /// List a directory
    Ls {
        /// Root hash or reference name
        root: String,

        /// Slash-separated path inside the root
        #[arg(default_value = "")]
        path: String,
    },

    /// Manage references
    #[command(subcommand)]
    Refs(RefsCommands),
}

#[derive(Subcommand)]
enum RefsCommands {
    /// Point a reference at a root
    Add {
        /// Reference name
        name: String,

        /// Hash to reference
        hash: String,

        /// How the root is stored (tree, blob or list)
        #[arg(long, default_value = "tree")]
        kind: String,
    },

    /// List all references
    List,

    /// Remove a reference
    Rm {
        /// Reference name
        name: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let output = OutputWriter::new(cli.json);

    // Determine store root: CLI arg > MDAG_ROOT env var > ./mdag-store default
    let root = cli
        .root
        .or_else(|| std::env::var("MDAG_ROOT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./mdag-store"));
    debug!(root = %root.display(), "using store");

    let result = match cli.command {
        Commands::Init { algo, compression } => cmd_init(&root, &algo, &compression, &output),
        Commands::Add { paths, ref_name } => cmd_add(&root, paths, ref_name, &output),
        Commands::Cat { root: spec, path } => cmd_cat(&root, &spec, &path),
        Commands::CatFile { hash, kind } => cmd_cat_file(&root, &hash, &kind),
        Commands::Ls { root: spec, path } => cmd_ls(&root, &spec, &path, &output),
        Commands::Refs(refs_cmd) => match refs_cmd {
            RefsCommands::Add { name, hash, kind } => {
                cmd_refs_add(&root, &name, &hash, &kind, &output)
            }
            RefsCommands::List => cmd_refs_list(&root, &output),
            RefsCommands::Rm { name } => cmd_refs_rm(&root, &name, &output),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.write_error(&err, 1);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, filtered by MDAG_LOG (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("MDAG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_store(root: &Path) -> Result<FsStore> {
    FsStore::open(root).with_context(|| format!("Failed to open store at {}", root.display()))
}

fn lookup_root(store: &FsStore, spec: &str) -> Result<RootRef> {
    store
        .refs()
        .lookup(spec)
        .with_context(|| format!("Unknown root: {}", spec))
}

fn cmd_init(root: &Path, algo: &str, compression: &str, output: &OutputWriter) -> Result<()> {
    let algorithm = Algorithm::parse(algo)?;
    let compression = CompressionType::parse(compression)?;

    FsStore::init(root, algorithm, compression)
        .with_context(|| format!("Failed to initialize store at {}", root.display()))?;

    let data = InitOutput {
        root: root.display().to_string(),
        algorithm: algorithm.as_str().to_string(),
        compression: compression.as_str().to_string(),
    };

    output.write(&data, || {
        format!(
            "Initialized mdag store at {}\nAlgorithm: {}\nCompression: {}\n",
            data.root, data.algorithm, data.compression
        )
    })
}

fn cmd_add(
    root: &Path,
    paths: Vec<PathBuf>,
    ref_name: Option<String>,
    output: &OutputWriter,
) -> Result<()> {
    let store = open_store(root)?;
    let mut objects = Vec::new();
    let mut reference = None;

    for path in paths {
        let added = store
            .add_path(&path)
            .with_context(|| format!("Failed to add path: {}", path.display()))?;

        if let Some(name) = &ref_name {
            store
                .refs()
                .set(name, RootRef::new(added.hash, added.kind))
                .with_context(|| format!("Failed to create reference: {}", name))?;
            reference = Some(ReferenceCreated {
                name: name.clone(),
                hash: added.hash,
                kind: added.kind,
            });
        }

        objects.push(AddedObject {
            hash: added.hash,
            kind: added.kind,
            size: added.size,
            path: path.display().to_string(),
        });
    }

    let data = AddOutput {
        objects,
        reference,
    };

    output.write(&data, || {
        let mut text = String::new();
        for obj in &data.objects {
            let _ = writeln!(text, "{} {} {}", obj.hash, obj.kind, obj.path);
        }
        if let Some(r) = &data.reference {
            let _ = writeln!(text, "Created reference: {} -> {}", r.name, r.hash);
        }
        text
    })
}

fn cmd_cat(root: &Path, spec: &str, path: &str) -> Result<()> {
    let store = open_store(root)?;
    let target = lookup_root(&store, spec)?;
    if target.kind != NodeKind::Tree {
        anyhow::bail!("{} is a {} root, not a directory", spec, target.kind);
    }

    let mut out = io::stdout().lock();
    let written = DagReader::new(&store)
        .resolve_to_writer(&target.hash, path, &mut out)
        .with_context(|| format!("Failed to read {} under {}", path, target.hash))?;
    out.flush()?;

    match written {
        Some(_) => Ok(()),
        None => anyhow::bail!("Not found: {} under {}", path, target.hash),
    }
}

fn cmd_cat_file(root: &Path, hash_str: &str, kind: &str) -> Result<()> {
    let store = open_store(root)?;
    let hash = Hash::from_hex(hash_str).with_context(|| format!("Invalid hash: {}", hash_str))?;
    let kind = NodeKind::parse(kind)?;

    let mut out = io::stdout().lock();
    DagReader::new(&store)
        .write_file(&hash, kind, &mut out)
        .with_context(|| format!("Failed to read file root {}", hash))?;
    out.flush()?;

    Ok(())
}

fn cmd_ls(root: &Path, spec: &str, path: &str, output: &OutputWriter) -> Result<()> {
    let store = open_store(root)?;
    let target = lookup_root(&store, spec)?;

    let entries = list(&store, &target.hash, path)
        .with_context(|| format!("Failed to list {} under {}", path, target.hash))?
        .with_context(|| format!("No directory at {:?} under {}", path, target.hash))?;

    let data = LsOutput {
        root: target.hash,
        path: path.to_string(),
        entries,
    };

    output.write(&data, || {
        let mut text = String::new();
        for entry in &data.entries {
            let _ = writeln!(
                text,
                "{} {:>12} {} {}",
                entry.kind.tag_str(),
                entry.size,
                entry.hash,
                entry.name
            );
        }
        text
    })
}

fn cmd_refs_add(
    root: &Path,
    name: &str,
    hash_str: &str,
    kind: &str,
    output: &OutputWriter,
) -> Result<()> {
    let store = open_store(root)?;
    let hash = Hash::from_hex(hash_str).with_context(|| format!("Invalid hash: {}", hash_str))?;
    let target = RootRef::new(hash, NodeKind::parse(kind)?);

    store
        .refs()
        .set(name, target)
        .with_context(|| format!("Failed to add reference: {}", name))?;

    let data = RefsAddOutput {
        name: name.to_string(),
        root: target,
    };

    output.write(&data, || {
        format!("{} -> {} ({})\n", data.name, data.root.hash, data.root.kind)
    })
}

fn cmd_refs_list(root: &Path, output: &OutputWriter) -> Result<()> {
    let store = open_store(root)?;
    let refs = store
        .refs()
        .list()
        .with_context(|| "Failed to list references")?;

    let data = RefsListOutput {
        refs: refs
            .into_iter()
            .map(|(name, root)| RefInfo { name, root })
            .collect(),
    };

    output.write(&data, || {
        if data.refs.is_empty() {
            return "No references\n".to_string();
        }
        let mut text = String::new();
        for r in &data.refs {
            let _ = writeln!(text, "{} -> {} ({})", r.name, r.root.hash, r.root.kind);
        }
        text
    })
}

fn cmd_refs_rm(root: &Path, name: &str, output: &OutputWriter) -> Result<()> {
    let store = open_store(root)?;
    store
        .refs()
        .remove(name)
        .with_context(|| format!("Failed to remove reference: {}", name))?;

    let data = RefsRmOutput {
        name: name.to_string(),
    };

    output.write(&data, || format!("Removed reference: {}\n", data.name))
}
