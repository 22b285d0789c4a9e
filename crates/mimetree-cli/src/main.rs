//! `mimetree` - inspect and re-serialize MIME messages.
//!
//! ```text
//! mimetree tree <file>
//! mimetree headers <file>
//! mimetree reserialize <file> [--boundary-counter N]
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser as _, Subcommand};
use mimetree::{MimeNode, Parser, SerializeConfig};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Inspect and re-serialize MIME messages.
#[derive(Debug, clap::Parser)]
#[command(name = "mimetree", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print the part tree
    Tree {
        /// Raw message file
        path: PathBuf,
    },
    /// Print top-level headers only
    Headers {
        /// Raw message file
        path: PathBuf,
    },
    /// Parse and write the message back out
    Reserialize {
        /// Raw message file
        path: PathBuf,
        /// Starting value of the boundary counter
        #[arg(long, default_value_t = 0)]
        boundary_counter: u32,
    },
}

impl Command {
    fn path(&self) -> &Path {
        match self {
            Self::Tree { path } | Self::Headers { path } | Self::Reserialize { path, .. } => path,
        }
    }
}

fn run(command: &Command) -> anyhow::Result<()> {
    let path = command.path();
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    info!(path = %path.display(), bytes = raw.len(), "Read message");

    let mut stdout = std::io::stdout().lock();
    match command {
        Command::Headers { .. } => {
            let node = MimeNode::parse_headers(&raw)?;
            write!(stdout, "{}", node.headers)?;
        }
        Command::Tree { .. } => {
            let node = parse_reporting(&raw)?;
            write!(stdout, "{}", node.to_tree())?;
        }
        Command::Reserialize {
            boundary_counter, ..
        } => {
            let node = parse_reporting(&raw)?;
            let config = SerializeConfig::builder()
                .boundary_counter(*boundary_counter)
                .build();
            stdout.write_all(&node.to_bytes_with(config)?)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn parse_reporting(raw: &[u8]) -> anyhow::Result<MimeNode> {
    let mut parser = Parser::default();
    let node = parser.parse(raw)?;
    let diagnostics = parser.diagnostics();
    if !diagnostics.is_empty() {
        warn!(count = diagnostics.len(), "Message parsed with diagnostics");
    }
    Ok(node)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mimetree=info,mimetree_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    run(&cli.command)
}
