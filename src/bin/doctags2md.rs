//! CLI binary for edgequake-doctags.
//!
//! Loads the model once, then walks the given files in order, mapping CLI
//! flags to `ExtractionConfig` and printing or writing the results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doctags::{
    convert_file, output_path_for, write_markdown, ConversionOutput, ConversionProgressCallback,
    DocTagsGenerator, DocTagsModel, ExtractError, ExtractionConfig, ExtractionPath, PageSelection, PageSeparator,
    ProgressCallback, DEFAULT_MODEL_ID,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One progress bar per document, with a log line per page showing which
/// path (structured or fallback) produced its text.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
            page_started: Mutex::new(None),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            f(bar);
        }
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_document_start(&self, source: &str, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(total_pages as u64);
        bar.set_style(style);
        bar.set_prefix(source.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {source} ({total_pages} pages)…"))
        ));

        *self.bar.lock().unwrap() = Some(bar);
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        *self.page_started.lock().unwrap() = Some(Instant::now());
        self.with_bar(|bar| bar.set_message(format!("page {page_num}")));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, path: ExtractionPath, text_len: usize) {
        let elapsed_ms = self
            .page_started
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        let mark = match path {
            ExtractionPath::Structured => green("✓"),
            ExtractionPath::Fallback => yellow("~"),
        };

        self.with_bar(|bar| {
            bar.println(format!(
                "  {} Page {:>3}/{:<3}  {:<10}  {:<8}  {}",
                mark,
                page_num,
                total,
                path,
                dim(&format!("{text_len:>5} chars")),
                dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
            ));
            bar.inc(1);
        });
    }

    fn on_document_complete(&self, total_pages: usize, fallback_count: usize) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }

        if fallback_count == 0 {
            eprintln!(
                "{} {} pages extracted",
                green("✔"),
                bold(&total_pages.to_string())
            );
        } else {
            eprintln!(
                "{} {} pages extracted  ({} via plain-text fallback)",
                yellow("⚠"),
                bold(&total_pages.to_string()),
                yellow(&fallback_count.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print Markdown for each file to stdout
  doctags2md report.pdf scan.png

  # Write report.md and scan.md into out/
  doctags2md report.pdf scan.png -o out/

  # Render at 300 DPI, first three pages only
  doctags2md --dpi 300 --pages 1-3 paper.pdf

  # Keep the raw DocTags and per-page paths
  doctags2md --json report.pdf > report.json

SERVING THE MODEL:
  The model runs behind any provider edgequake-llm knows. The usual setup is
  an OpenAI-compatible server hosting ds4sd/SmolDocling-256M-preview:

    vllm serve ds4sd/SmolDocling-256M-preview --port 8000
    export OPENAI_API_KEY=local OPENAI_BASE_URL=http://localhost:8000/v1
    doctags2md report.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          Key for the OpenAI-compatible server
  OPENAI_BASE_URL         Base URL of that server
  EDGEQUAKE_LLM_PROVIDER  Override provider (used with EDGEQUAKE_MODEL)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         libpdfium file, or the directory containing it
  RUST_LOG                Override the log filter
"#;

/// Extract PDFs and page images to Markdown with SmolDocling.
#[derive(Parser, Debug)]
#[command(
    name = "doctags2md",
    version,
    about = "Extract PDFs and page images to Markdown with SmolDocling",
    long_about = "Run SmolDocling on each page of the given PDFs or images, parse the DocTags it \
produces and export Markdown. Pages whose DocTags cannot be parsed fall back to plain text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or image (PNG, JPEG) files to process.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Rendering DPI for PDF pages (72–400).
    #[arg(long, env = "DOCTAGS2MD_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Cap the longest rendered edge in pixels (default: no cap).
    #[arg(long, env = "DOCTAGS2MD_MAX_PIXELS")]
    max_pixels: Option<u32>,

    /// Directory to save `{stem}.md` files (default: print to stdout).
    #[arg(short, long, env = "DOCTAGS2MD_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Model ID sent to the provider.
    #[arg(long, env = "DOCTAGS2MD_MODEL", default_value = DEFAULT_MODEL_ID)]
    model: String,

    /// Provider name: openai, ollama, lmstudio, …
    #[arg(long, env = "DOCTAGS2MD_PROVIDER")]
    provider: Option<String>,

    /// Max generated tokens per page.
    #[arg(long, env = "DOCTAGS2MD_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "DOCTAGS2MD_PAGES", default_value = "all")]
    pages: String,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, env = "DOCTAGS2MD_SEPARATOR", default_value = "hr")]
    separator: String,

    /// Omit the `## Page N` heading before each page.
    #[arg(long, env = "DOCTAGS2MD_NO_PAGE_HEADINGS")]
    no_page_headings: bool,

    /// Output structured JSON (ConversionOutput) instead of Markdown.
    #[arg(long, env = "DOCTAGS2MD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCTAGS2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCTAGS2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCTAGS2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Load the model once ──────────────────────────────────────────────
    if !cli.quiet {
        eprintln!("{} Loading model {}…", cyan("◆"), bold(&config.model));
    }
    let model = DocTagsModel::load(&config).context("Failed to load model")?;
    if !cli.quiet {
        eprintln!("{} Model loaded: {}", green("✔"), model.model_id());
    }

    let opts = RunOptions {
        output_dir: cli.output_dir.as_deref(),
        json: cli.json,
        quiet: cli.quiet,
        show_stats: !cli.quiet && !show_progress,
    };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    run_files(&model, &cli.files, &config, &opts, &mut handle, &mut io::stderr()).await?;

    Ok(())
}

/// How converted documents are emitted.
struct RunOptions<'a> {
    /// Write `{stem}.md` here instead of printing.
    output_dir: Option<&'a Path>,
    json: bool,
    quiet: bool,
    /// One stats line per file on stderr.
    show_stats: bool,
}

/// Convert `files` in order, printing to `out` or saving into the output dir.
/// Status lines go to `status`.
///
/// Missing files are skipped with a message, even when quiet; any other
/// error ends the run. Returns the number of files converted.
async fn run_files<G: DocTagsGenerator, W: Write, S: Write>(
    model: &G,
    files: &[PathBuf],
    config: &ExtractionConfig,
    opts: &RunOptions<'_>,
    out: &mut W,
    status: &mut S,
) -> Result<usize> {
    if let Some(dir) = opts.output_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let mut converted = 0;
    for file in files {
        let output = match convert_file(model, file, config).await {
            Ok(output) => output,
            Err(ExtractError::FileNotFound { path }) => {
                warn!("Skipping {}: file not found", path.display());
                writeln!(status, "{} Skipping {}: file not found", yellow("⚠"), path.display())
                    .context("Failed to write to stderr")?;
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Extraction failed for {}", file.display()))
            }
        };

        match opts.output_dir {
            Some(dir) => {
                let out_path = save_output(&output, file, dir, opts.json).await?;
                if !opts.quiet {
                    writeln!(status, "  Saved to {}", bold(&out_path.display().to_string()))
                        .context("Failed to write to stderr")?;
                }
            }
            None => print_output(out, &output, file, opts.json)?,
        }

        if opts.show_stats {
            writeln!(
                status,
                "{}: {} pages ({} fallback) in {}ms",
                file.display(),
                output.stats.processed_pages,
                output.stats.fallback_pages,
                output.stats.total_duration_ms
            )
            .context("Failed to write to stderr")?;
        }
        converted += 1;
    }

    Ok(converted)
}

/// Write `{stem}.md` (or `{stem}.json`) into `dir`.
async fn save_output(
    output: &ConversionOutput,
    input: &Path,
    dir: &Path,
    json: bool,
) -> Result<PathBuf> {
    let md_path = output_path_for(input, dir);
    if json {
        let path = md_path.with_extension("json");
        let body = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    } else {
        write_markdown(&md_path, &output.markdown)
            .await
            .context("Failed to write Markdown")?;
        Ok(md_path)
    }
}

/// Print one document behind a name banner.
fn print_output<W: Write>(
    out: &mut W,
    output: &ConversionOutput,
    input: &Path,
    json: bool,
) -> Result<()> {
    if json {
        let body = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        writeln!(out, "{body}").context("Failed to write to stdout")?;
        return Ok(());
    }

    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let rule = "=".repeat(60);

    write!(out, "\n{rule}\n {name}\n{rule}\n\n{}\n\n", output.markdown)
        .context("Failed to write to stdout")?;
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .model(cli.model.clone())
        .max_tokens(cli.max_tokens)
        .pages(parse_pages(&cli.pages)?)
        .page_separator(parse_separator(&cli.separator))
        .page_headings(!cli.no_page_headings);

    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(px) = cli.max_pixels {
        builder = builder.max_rendered_pixels(px);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
