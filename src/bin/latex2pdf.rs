//! CLI binary for edgequake-latex2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to node parameters
//! and a `ConversionConfig`, then writes PDFs or prints result JSON.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_latex2pdf::convert::file_parameters;
use edgequake_latex2pdf::{
    convert_batch, load_tex_file, write_pdf, ConversionConfig, ConversionProgressCallback,
    InputItem, ItemSummary, LatexEngine, NodeParameters, ParameterSource, ProcessCompiler,
    ProgressCallback, ResultItem, ValidationPolicy,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per item.
/// Items may settle out of order when `--concurrency` > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-item wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Display names by item index.
    labels: Vec<String>,
}

impl CliProgressCallback {
    fn new(labels: Vec<String>) -> Arc<Self> {
        let bar = ProgressBar::new(labels.len() as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} items  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Compiling");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            labels,
        })
    }

    fn label(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("item {}", index + 1))
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Compiling {total} document(s)…"))
        ));
    }

    fn on_item_start(&self, index: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(self.label(index));
    }

    fn on_item_complete(&self, index: usize, _total: usize, pdf_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:<32}  {:<10}  {}",
            green("✓"),
            self.label(index),
            dim(&format!("{pdf_len:>7} B")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, index: usize, _total: usize, error: &str) {
        let secs = self.elapsed_secs(index);

        // First line only, truncated, to keep output tidy.
        let first = error.lines().next().unwrap_or_default();
        let msg = if first.chars().count() > 80 {
            format!("{}\u{2026}", first.chars().take(79).collect::<String>())
        } else {
            first.to_string()
        };

        self.bar.println(format!(
            "  {} {:<32}  {}  {}",
            red("✗"),
            self.label(index),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} document(s) compiled successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} document(s) compiled  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compile a file next to it
  latex2pdf paper.tex

  # Several files into one directory, two at a time
  latex2pdf -o build/ --concurrency 2 a.tex b.tex c.tex

  # XeLaTeX, two passes, extra asset and font directories
  latex2pdf --engine xelatex --passes 2 --inputs ./figures --fonts ./fonts thesis.tex

  # Inline source
  latex2pdf --text '\documentclass{article}\begin{document}Hi\end{document}'

  # Run a host batch and print the result items
  latex2pdf --batch batch.json --continue-on-fail > results.json

  # Check which TeX engines are installed
  latex2pdf --check-install

BATCH FILE FORMAT:
  {
    "parameters": { "inputType": "text", "latexContent": "...", "latexCmd": "pdflatex" },
    "items": [ { "json": {}, "binary": {} } ]
  }
  "parameters" may also be an array with one object per item.

VALIDATION POLICIES:
  off       skip the pre-flight scan
  lenient   fail on missing \documentclass / \begin{document} / \end{document}
            (custom classes and bibliography commands only warn)  [default]
  strict    fail on any warning

ENVIRONMENT VARIABLES:
  LATEX2PDF_*        Fallback for every flag (e.g. LATEX2PDF_ENGINE=xelatex)
  SKIP_LATEX_CHECK   Set to "true" to make --check-install always succeed
  RUST_LOG           Override log filtering (e.g. RUST_LOG=edgequake_latex2pdf=debug)
"#;

/// Compile LaTeX documents to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "latex2pdf",
    version,
    about = "Compile LaTeX documents to PDF",
    long_about = "Compile LaTeX documents to PDF with pdflatex, xelatex or lualatex. \
Runs a heuristic pre-flight scan, compiles each document in its own scratch \
directory, and adds guidance to common compiler errors.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// `.tex` files to compile.
    #[arg(conflicts_with_all = ["text", "batch"])]
    files: Vec<PathBuf>,

    /// Compile this LaTeX source instead of files.
    #[arg(long, conflicts_with = "batch")]
    text: Option<String>,

    /// Run a host batch file (`{parameters, items}`) and print result JSON.
    #[arg(long, env = "LATEX2PDF_BATCH")]
    batch: Option<PathBuf>,

    /// Directory PDFs are written to. Default: next to each input file
    /// (current directory for --text).
    #[arg(short, long, env = "LATEX2PDF_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// TeX engine.
    #[arg(long, env = "LATEX2PDF_ENGINE", value_enum, default_value = "pdflatex")]
    engine: EngineArg,

    /// Number of engine runs per document.
    #[arg(long, env = "LATEX2PDF_PASSES", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    passes: u32,

    /// Extra directory searched for \input and \includegraphics assets.
    #[arg(long, env = "LATEX2PDF_INPUTS")]
    inputs: Option<String>,

    /// Extra directory searched for fonts.
    #[arg(long, env = "LATEX2PDF_FONTS")]
    fonts: Option<String>,

    /// Directory holding the TeX engines. Default: search PATH.
    #[arg(long, env = "LATEX2PDF_TEX_BIN_DIR")]
    tex_bin_dir: Option<PathBuf>,

    /// Pre-flight scan policy: off, lenient, strict.
    #[arg(long, env = "LATEX2PDF_VALIDATION", value_enum, default_value = "lenient")]
    validation: ValidationArg,

    /// Record failures and keep going instead of stopping at the first one.
    #[arg(long, env = "LATEX2PDF_CONTINUE_ON_FAIL")]
    continue_on_fail: bool,

    /// Documents compiled at the same time.
    #[arg(short, long, env = "LATEX2PDF_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Per-document compile timeout in seconds.
    #[arg(long, env = "LATEX2PDF_TIMEOUT")]
    timeout: Option<u64>,

    /// Print result items as JSON on stdout.
    #[arg(long, env = "LATEX2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "LATEX2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Report installed TeX engines and exit.
    #[arg(long)]
    check_install: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LATEX2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "LATEX2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EngineArg {
    Pdflatex,
    Xelatex,
    Lualatex,
}

impl From<EngineArg> for LatexEngine {
    fn from(v: EngineArg) -> Self {
        match v {
            EngineArg::Pdflatex => LatexEngine::Pdflatex,
            EngineArg::Xelatex => LatexEngine::Xelatex,
            EngineArg::Lualatex => LatexEngine::Lualatex,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ValidationArg {
    Off,
    Lenient,
    Strict,
}

impl From<ValidationArg> for ValidationPolicy {
    fn from(v: ValidationArg) -> Self {
        match v {
            ValidationArg::Off => ValidationPolicy::Off,
            ValidationArg::Lenient => ValidationPolicy::Lenient,
            ValidationArg::Strict => ValidationPolicy::Strict,
        }
    }
}

/// A host batch read from `--batch`.
#[derive(Debug, Deserialize)]
struct BatchFile {
    #[serde(default)]
    parameters: BatchParameters,
    items: Vec<InputItem>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchParameters {
    PerItem(Vec<NodeParameters>),
    Shared(NodeParameters),
}

impl Default for BatchParameters {
    fn default() -> Self {
        BatchParameters::Shared(NodeParameters::new())
    }
}

impl BatchParameters {
    fn as_source(&self) -> &dyn ParameterSource {
        match self {
            BatchParameters::PerItem(p) => p,
            BatchParameters::Shared(p) => p,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs unless --verbose is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check_install;
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

    // ── Install check ────────────────────────────────────────────────────
    if cli.check_install {
        let report = latex_probe::check_installation().context("LaTeX installation check failed")?;
        if !cli.quiet {
            print!("{report}");
        }
        return Ok(());
    }

    let compiler = match cli.tex_bin_dir {
        Some(ref dir) => ProcessCompiler::with_bin_dir(dir),
        None => ProcessCompiler::new(),
    };

    // ── Batch mode ───────────────────────────────────────────────────────
    if let Some(ref path) = cli.batch {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read batch file {}", path.display()))?;
        let batch: BatchFile = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid batch file {}", path.display()))?;

        let labels = (1..=batch.items.len()).map(|i| format!("item {i}")).collect();
        let config = build_config(&cli, progress_callback(show_progress, labels))?;

        let results = convert_batch(
            &batch.items,
            batch.parameters.as_source(),
            &compiler,
            &config,
        )
        .await
        .context("Batch failed")?;

        println!(
            "{}",
            serde_json::to_string_pretty(&results).context("Failed to serialise results")?
        );
        return Ok(());
    }

    // ── Inline text ──────────────────────────────────────────────────────
    if let Some(ref text) = cli.text {
        let params = node_parameters(&cli)
            .with("inputType", "text")
            .with("latexContent", text.as_str());
        let config = build_config(&cli, progress_callback(show_progress, vec!["--text".into()]))?;

        let results = convert_batch(&[InputItem::new()], &params, &compiler, &config)
            .await
            .context("Compilation failed")?;

        let out_dir = cli.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        return finish(&cli, &results, |result| {
            let name = match &result.json {
                ItemSummary::Success(s) => s.filename.clone(),
                ItemSummary::Failure(_) => "output.pdf".to_string(),
            };
            out_dir.join(name)
        })
        .await;
    }

    // ── Files ────────────────────────────────────────────────────────────
    if cli.files.is_empty() {
        anyhow::bail!("No input given: pass .tex files, --text or --batch");
    }

    let mut items = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        items.push(load_tex_file(path).await?);
    }

    let labels = cli.files.iter().map(|p| p.display().to_string()).collect();
    let config = build_config(&cli, progress_callback(show_progress, labels))?;
    let params = file_parameters(&node_parameters(&cli));

    let results = convert_batch(&items, &params, &compiler, &config)
        .await
        .context("Compilation failed")?;

    let targets: Vec<PathBuf> = cli
        .files
        .iter()
        .map(|p| pdf_path_for(p, cli.output_dir.as_deref()))
        .collect();
    let mut targets = targets.into_iter();
    finish(&cli, &results, |_| targets.next().unwrap_or_default()).await
}

/// Write every successful PDF, then print JSON or a summary.
async fn finish(
    cli: &Cli,
    results: &[ResultItem],
    mut target: impl FnMut(&ResultItem) -> PathBuf,
) -> Result<()> {
    let mut written = Vec::new();
    for result in results {
        let path = target(result);
        if result.is_success() {
            write_pdf(result, &path).await?;
            written.push(path);
        }
    }

    if cli.json {
        let summaries: Vec<_> = results.iter().map(|r| &r.json).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&summaries).context("Failed to serialise results")?
        );
    } else if !cli.quiet {
        for path in &written {
            eprintln!("  →  {}", bold(&path.display().to_string()));
        }
        for result in results {
            if let Some(error) = result.error() {
                eprintln!("{}", red(error));
            }
        }
    }

    Ok(())
}

/// `<output_dir or input dir>/<stem>.pdf`.
fn pdf_path_for(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "output".into());
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(stem).with_extension("pdf")
}

/// Map engine/pass/directory flags to node parameters.
fn node_parameters(cli: &Cli) -> NodeParameters {
    let engine: LatexEngine = cli.engine.into();
    let mut params = NodeParameters::new()
        .with("latexCmd", engine.as_str())
        .with("passes", cli.passes);

    let mut option = Map::new();
    if let Some(ref inputs) = cli.inputs {
        option.insert("inputs".into(), Value::String(inputs.clone()));
    }
    if let Some(ref fonts) = cli.fonts {
        option.insert("fonts".into(), Value::String(fonts.clone()));
    }
    if !option.is_empty() {
        params = params.with(
            "additionalOptions",
            serde_json::json!({ "option": [Value::Object(option)] }),
        );
    }
    params
}

fn progress_callback(show: bool, labels: Vec<String>) -> Option<ProgressCallback> {
    show.then(|| CliProgressCallback::new(labels) as Arc<dyn ConversionProgressCallback>)
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .continue_on_fail(cli.continue_on_fail)
        .validation(cli.validation.into())
        .concurrency(cli.concurrency);

    if let Some(secs) = cli.timeout {
        builder = builder.compile_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
