//! OpenLABEL CLI - Inspect, validate and convert annotation files
//!
//! Entry point for the `openlabel` binary.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use openlabel_model::binary::MAGIC;
use openlabel_model::serialization::migrate;
use openlabel_model::{
    Document, ElementKind, SchemaValidator, SerializeOptions, ValidatorConfig,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Work with OpenLABEL annotation files.
#[derive(Parser)]
#[command(name = "openlabel", version, about = "Inspect, validate and convert OpenLABEL files")]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. `info`, `openlabel_model=debug`).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a JSON file against the OpenLABEL schema.
    Validate {
        file: PathBuf,
        /// Skip cross-reference checks (relation agents, coordinate system tree).
        #[arg(long)]
        lenient: bool,
    },
    /// Convert between JSON and the compact binary form.
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        to: Format,
        /// Indent JSON output.
        #[arg(long)]
        pretty: bool,
    },
    /// Print a summary of a document.
    Info { file: PathBuf },
    /// Print the content of one frame as JSON.
    Frame {
        file: PathBuf,
        frame: u64,
        /// Merge static elements and their static data into the output.
        #[arg(long)]
        with_static: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Binary,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Validate { file, lenient } => validate(&file, lenient),
        Command::Convert {
            input,
            output,
            to,
            pretty,
        } => convert(&input, &output, to, pretty),
        Command::Info { file } => print_info(&file),
        Command::Frame {
            file,
            frame,
            with_static,
        } => print_frame(&file, frame, with_static),
    }
}

/// Load a document, picking the decoder from the leading bytes.
fn open(path: &Path) -> Result<Document> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let doc = if bytes.starts_with(MAGIC) {
        debug!("{} is binary", path.display());
        Document::from_binary(&bytes)?
    } else {
        let text = std::str::from_utf8(&bytes)
            .with_context(|| format!("{} is neither UTF-8 JSON nor binary", path.display()))?;
        Document::from_json(text)?
    };
    info!("Loaded {}", path.display());
    Ok(doc)
}

fn validate(path: &Path, lenient: bool) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let raw: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let tree = migrate(raw)?;

    let validator = SchemaValidator::with_config(ValidatorConfig {
        check_references: !lenient,
        ..ValidatorConfig::default()
    });
    validator.validate(&tree)?;

    println!("{}: valid", path.display());
    Ok(())
}

fn convert(input: &Path, output: &Path, to: Format, pretty: bool) -> Result<()> {
    let doc = open(input)?;
    match to {
        Format::Json => doc.save(
            output,
            SerializeOptions {
                pretty,
                ..SerializeOptions::default()
            },
        )?,
        Format::Binary => {
            if pretty {
                bail!("--pretty only applies to JSON output");
            }
            doc.save_binary(output)?;
        }
    }
    info!("Wrote {}", output.display());
    Ok(())
}

fn print_info(path: &Path) -> Result<()> {
    let doc = open(path)?;
    let meta = doc.metadata();

    println!("{}", path.display());
    println!("  schema version: {}", meta.schema_version);
    if let Some(name) = &meta.name {
        println!("  name:           {name}");
    }
    if let Some(annotator) = &meta.annotator {
        println!("  annotator:      {annotator}");
    }
    println!(
        "  uid mode:       {}",
        if doc.uses_uuid() { "uuid" } else { "sequential" }
    );

    for kind in ElementKind::ALL {
        println!("  {:<15} {}", format!("{}:", kind.plural()), doc.num_elements(kind));
    }
    println!("  {:<15} {}", "relations:", doc.relations().len());
    println!("  {:<15} {}", "streams:", doc.streams().len());
    println!("  {:<15} {}", "frames:", doc.frames().len());

    match doc.outer_frame_interval() {
        Some(outer) => println!("  frame range:    {}..={}", outer.start(), outer.end()),
        None => println!("  frame range:    (static only)"),
    }
    Ok(())
}

fn print_frame(path: &Path, frame: u64, with_static: bool) -> Result<()> {
    let doc = open(path)?;
    match doc.stringify_frame(frame, !with_static, true)? {
        Some(text) => {
            println!("{text}");
            Ok(())
        }
        None => bail!("frame {frame} is not present in {}", path.display()),
    }
}
