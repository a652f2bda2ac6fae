//! Compiler invocation: hand LaTeX source to a TeX engine and collect the PDF.
//!
//! The engine is reached through the [`LatexCompiler`] trait so the pipeline
//! never depends on *how* output arrives. An implementation returns a
//! [`PdfStream`]: zero or more byte chunks, then either the end of the stream
//! (success) or an `Err` item (the engine reported an error).
//!
//! [`compile`] drives one such stream for one item:
//!
//! * chunks are concatenated in arrival order;
//! * an `Err` item discards everything received so far and becomes
//!   [`ConversionError::CompilationFailed`] with an enriched message
//!   (see [`crate::pipeline::hints`]);
//! * a clean end with zero bytes is **not** success: it becomes
//!   [`ConversionError::EmptyOutput`].
//!
//! Exactly one `compile` call is made per item. Multi-pass compilation is the
//! implementation's business: `passes` is forwarded in [`CompileOptions`].
//!
//! [`ProcessCompiler`] is the stock implementation, spawning the engine with
//! `tokio::process`.

use crate::config::LatexEngine;
use crate::error::ConversionError;
use crate::pipeline::hints;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// A boxed stream of PDF byte chunks.
pub type PdfStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, CompilerError>> + Send>>;

/// The error signal of a [`PdfStream`]: raw, unenriched compiler text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompilerError {
    pub message: String,
}

impl CompilerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Options forwarded to a [`LatexCompiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Engine binary.
    pub cmd: LatexEngine,
    /// Number of engine runs; always ≥ 1.
    pub passes: u32,
    /// Extra engine arguments. Always `["-halt-on-error"]` from the pipeline.
    pub args: Vec<String>,
    /// Extra directory searched for source assets.
    pub inputs: Option<String>,
    /// Extra directory searched for fonts.
    pub fonts: Option<String>,
    /// Directory to run the engine in. `None` lets the implementation pick one.
    pub work_dir: Option<PathBuf>,
}

impl CompileOptions {
    /// The fixed argument list used by the pipeline.
    pub fn default_args() -> Vec<String> {
        vec!["-halt-on-error".to_string()]
    }
}

/// Anything that can turn LaTeX source into a stream of PDF bytes.
///
/// Implementations must be `Send + Sync`: a batch running with
/// `concurrency > 1` shares one compiler across in-flight items.
pub trait LatexCompiler: Send + Sync {
    fn compile(&self, source: &str, options: &CompileOptions) -> PdfStream;
}

/// Compile one item's source, applying the empty-output policy and error
/// enrichment.
///
/// With `timeout_secs` set, the stream is dropped once the limit elapses;
/// [`ProcessCompiler`] kills its child process when that happens.
pub async fn compile(
    compiler: &dyn LatexCompiler,
    source: &str,
    options: &CompileOptions,
    timeout_secs: Option<u64>,
) -> Result<Vec<u8>, ConversionError> {
    let collected = collect_chunks(compiler.compile(source, options));

    let outcome = match timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), collected)
            .await
            .map_err(|_| ConversionError::CompileTimeout { secs })?,
        None => collected.await,
    };

    let pdf = outcome.map_err(|e| {
        warn!("{} reported an error: {}", options.cmd, e.message);
        ConversionError::CompilationFailed {
            message: hints::enrich_compiler_error(&e.message),
        }
    })?;

    if pdf.is_empty() {
        return Err(ConversionError::EmptyOutput);
    }

    debug!("{} produced {} bytes", options.cmd, pdf.len());
    Ok(pdf)
}

async fn collect_chunks(mut stream: PdfStream) -> Result<Vec<u8>, CompilerError> {
    let mut pdf = Vec::new();
    while let Some(chunk) = stream.next().await {
        pdf.extend_from_slice(&chunk?);
    }
    Ok(pdf)
}

// ── Process-backed implementation ────────────────────────────────────────

/// Base name of the files the engine reads and writes.
const JOB_NAME: &str = "texput";
/// Read size for streaming the finished PDF back.
const CHUNK_SIZE: usize = 64 * 1024;
/// Lines of engine stdout kept when the log has no `!` error lines.
const STDOUT_TAIL_LINES: usize = 20;

/// Runs a real TeX engine as a child process.
///
/// For each compile it writes `texput.tex` into the working directory, runs
/// the engine `passes` times with `-interaction=nonstopmode`, and streams
/// `texput.pdf` back in 64 KiB chunks. Auxiliary directories are exported
/// through `TEXINPUTS` (inputs) and `TTFONTS`/`OPENTYPEFONTS` (fonts), made
/// absolute against the caller's working directory and given a trailing
/// separator so the distribution's own trees stay searchable.
///
/// Engines are looked up on `PATH` unless [`ProcessCompiler::with_bin_dir`]
/// names the TeX distribution's binary directory.
#[derive(Debug, Clone, Default)]
pub struct ProcessCompiler {
    bin_dir: Option<PathBuf>,
}

impl ProcessCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run engines from `dir` (e.g. `/usr/local/texlive/2024/bin/x86_64-linux`)
    /// instead of searching `PATH`.
    pub fn with_bin_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: Some(dir.into()),
        }
    }

    fn program(&self, cmd: LatexEngine) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(cmd.as_str()),
            None => PathBuf::from(cmd.as_str()),
        }
    }
}

impl LatexCompiler for ProcessCompiler {
    fn compile(&self, source: &str, options: &CompileOptions) -> PdfStream {
        let source = source.to_string();
        let options = options.clone();
        let program = self.program(options.cmd);

        let run = async move { run_engine(&program, &source, &options).await };

        Box::pin(stream::once(run).flat_map(|outcome| -> PdfStream {
            match outcome {
                Ok(Some(output)) => read_chunks(output),
                // Engine succeeded but wrote no PDF: clean, empty end.
                Ok(None) => Box::pin(stream::empty()),
                Err(e) => Box::pin(stream::once(async move { Err(e) })),
            }
        }))
    }
}

/// A finished PDF ready to be streamed, plus the scratch directory that must
/// outlive the read when the compiler created its own.
struct EngineOutput {
    file: tokio::fs::File,
    _scratch: Option<TempDir>,
}

async fn run_engine(
    program: &Path,
    source: &str,
    options: &CompileOptions,
) -> Result<Option<EngineOutput>, CompilerError> {
    let (dir, scratch) = match &options.work_dir {
        Some(dir) => (dir.clone(), None),
        None => {
            let tmp = tempfile::Builder::new()
                .prefix("latex2pdf-")
                .tempdir()
                .map_err(|e| CompilerError::new(format!("Failed to create working directory: {e}")))?;
            (tmp.path().to_path_buf(), Some(tmp))
        }
    };

    let tex_path = dir.join(format!("{JOB_NAME}.tex"));
    tokio::fs::write(&tex_path, source)
        .await
        .map_err(|e| CompilerError::new(format!("Failed to write {}: {e}", tex_path.display())))?;

    let cmd = options.cmd.as_str();
    let passes = options.passes.max(1);
    for pass in 1..=passes {
        info!("Running {} (pass {}/{})", cmd, pass, passes);
        let output = engine_command(program, options, &dir)
            .output()
            .await
            .map_err(|e| spawn_error(program, e))?;

        if !output.status.success() {
            let message = failure_message(&dir, &output).await;
            debug!("{} exited with {}: {}", cmd, output.status, message);
            return Err(CompilerError::new(message));
        }
    }

    let pdf_path = dir.join(format!("{JOB_NAME}.pdf"));
    match tokio::fs::File::open(&pdf_path).await {
        Ok(file) => Ok(Some(EngineOutput {
            file,
            _scratch: scratch,
        })),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} finished without writing {}", cmd, pdf_path.display());
            Ok(None)
        }
        Err(e) => Err(CompilerError::new(format!(
            "Failed to open {}: {e}",
            pdf_path.display()
        ))),
    }
}

fn engine_command(program: &Path, options: &CompileOptions, dir: &Path) -> Command {
    let mut command = Command::new(program);
    command
        .args(&options.args)
        .arg("-interaction=nonstopmode")
        .arg(format!("-output-directory={}", dir.display()))
        .arg(format!("{JOB_NAME}.tex"))
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(inputs) = &options.inputs {
        command.env("TEXINPUTS", search_path(inputs));
    }
    if let Some(fonts) = &options.fonts {
        let fonts = search_path(fonts);
        command.env("TTFONTS", &fonts).env("OPENTYPEFONTS", &fonts);
    }
    command
}

/// `dir` resolved against the current directory, followed by the platform
/// path separator, which kpathsea expands to the default search path.
///
/// The engine runs inside the scratch workspace, where a relative entry
/// would resolve to nothing.
fn search_path(dir: &str) -> String {
    let sep = if cfg!(windows) { ';' } else { ':' };
    let dir = std::path::absolute(dir).unwrap_or_else(|_| PathBuf::from(dir));
    format!("{}{sep}", dir.display())
}

fn spawn_error(program: &Path, e: std::io::Error) -> CompilerError {
    let cmd = program.display();
    if e.kind() != std::io::ErrorKind::NotFound {
        return CompilerError::new(format!("Failed to run `{cmd}`: {e}"));
    }
    let location = if program.parent().is_some_and(|p| !p.as_os_str().is_empty()) {
        "not found"
    } else {
        "not found on PATH"
    };
    CompilerError::new(format!(
        "`{cmd}` {location}\n\n{}",
        latex_probe::install_instructions(std::env::consts::OS)
    ))
}

/// Best error text for a failed run: `!` lines from the log, else the tail
/// of stdout, else the exit status.
async fn failure_message(dir: &Path, output: &std::process::Output) -> String {
    let log_path = dir.join(format!("{JOB_NAME}.log"));
    if let Ok(bytes) = tokio::fs::read(&log_path).await {
        let errors = extract_log_errors(&String::from_utf8_lossy(&bytes));
        if !errors.is_empty() {
            return errors;
        }
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    let tail = lines[lines.len().saturating_sub(STDOUT_TAIL_LINES)..].join("\n");
    if !tail.trim().is_empty() {
        return tail.trim().to_string();
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        return stderr.trim().to_string();
    }

    format!("engine exited with {}", output.status)
}

static RE_LOG_LINE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^l\.\d+").unwrap());

/// Pull the `! ...` error lines out of a TeX log, each followed by its
/// `l.<n>` source-line reference when the log has one.
pub fn extract_log_errors(log: &str) -> String {
    let lines: Vec<&str> = log.lines().collect();
    let mut picked = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !line.starts_with('!') {
            continue;
        }
        picked.push(line.trim_end().to_string());
        if let Some(context) = lines[i + 1..]
            .iter()
            .take(8)
            .find(|l| RE_LOG_LINE_REF.is_match(l))
        {
            picked.push(context.trim_end().to_string());
        }
    }

    picked.join("\n")
}

fn read_chunks(output: EngineOutput) -> PdfStream {
    Box::pin(stream::unfold(Some(output), |state| async move {
        let mut output = state?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        match output.file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some(output)))
            }
            Err(e) => Some((
                Err(CompilerError::new(format!("Failed to read PDF output: {e}"))),
                None,
            )),
        }
    }))
}
