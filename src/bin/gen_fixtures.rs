//! Draw the sample page images used by the live-model test suite.
//!
//! ```text
//! cargo run --features cli,fixtures --bin gen-fixtures [-- <dir>]
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doctags::fixtures;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Write simple_text.png, table_doc.png and mixed_content.png.
#[derive(Parser, Debug)]
#[command(name = "gen-fixtures", version)]
struct Cli {
    /// Target directory, created if missing.
    #[arg(default_value = "tests/fixtures/images")]
    dir: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let written = fixtures::generate_all(&cli.dir)
        .with_context(|| format!("Failed to generate fixtures in {}", cli.dir.display()))?;
    for path in written {
        println!("Created {}", path.display());
    }
    Ok(())
}
