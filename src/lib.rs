//! # edgequake-latex2pdf
//!
//! Compile LaTeX source into PDF, one workflow item at a time.
//!
//! Each input item carries its LaTeX either inline (a parameter) or as a
//! base64 binary attachment. The crate resolves the item's parameters, runs a
//! cheap heuristic pre-flight scan, hands the source to a TeX engine through
//! the [`LatexCompiler`] trait, and returns the PDF as a base64 attachment with
//! a small JSON summary. Exactly one [`ResultItem`] comes back per input item,
//! in input order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! item
//!  │
//!  ├─ 1. Resolve   per-item parameters → ConversionRequest
//!  ├─ 2. Acquire   inline text, or base64 → UTF-8 attachment
//!  ├─ 3. Validate  heuristic scan (structural markers, custom class, bibliography)
//!  ├─ 4. Compile   LatexCompiler stream in a scratch workspace (always removed)
//!  └─ 5. Package   output-<millis>.pdf + {success, filename, mimeType, fileSize, warnings?}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_latex2pdf::{convert_batch, ConversionConfig, InputItem, NodeParameters, ProcessCompiler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let params = NodeParameters::new()
//!         .with("latexContent", "\\documentclass{article}\\begin{document}Hi\\end{document}")
//!         .with("latexCmd", "pdflatex");
//!     let config = ConversionConfig::builder().continue_on_fail(true).build()?;
//!
//!     let results = convert_batch(&[InputItem::new()], &params, &ProcessCompiler::new(), &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&results)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `latex2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-latex2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;
pub mod templates;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ConversionRequest, LatexEngine, LatexSource,
    NodeParameters, ParameterSource, ValidationPolicy,
};
pub use convert::{
    convert_batch, convert_file, convert_item, convert_sync, load_tex_file, process_item,
    write_pdf,
};
pub use error::{ConversionError, ErrorKind, Latex2PdfError};
pub use output::{BinaryData, InputItem, ItemSummary, ResultItem};
pub use pipeline::compile::{
    CompileOptions, CompilerError, LatexCompiler, PdfStream, ProcessCompiler,
};
pub use pipeline::validate::{validate_heuristic, ValidationResult, ValidationWarning};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, ResultStream};
