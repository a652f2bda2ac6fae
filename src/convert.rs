//! Eager (whole-batch) conversion entry points.
//!
//! [`convert_item`] is the per-item pipeline; [`process_item`] applies the
//! continue-on-failure decision to it; [`convert_batch`] drives a batch and
//! returns exactly one [`ResultItem`] per input item, in input order. Use
//! [`crate::stream::convert_stream`] to receive results as they settle.
//!
//! The file helpers ([`load_tex_file`], [`write_pdf`], [`convert_file`]) back
//! the CLI and are handy for callers working with files on disk.

use crate::config::{
    ConversionConfig, ConversionRequest, NodeParameters, ParameterSource, ValidationPolicy,
};
use crate::error::{ConversionError, Latex2PdfError};
use crate::output::{InputItem, ResultItem};
use crate::pipeline::compile::{self, LatexCompiler};
use crate::pipeline::validate::validate_heuristic;
use crate::pipeline::workspace::Workspace;
use crate::pipeline::{encode, input, package};
use crate::progress::ConversionProgressCallback;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Binary property a file loaded by [`load_tex_file`] is attached under.
pub const FILE_PROPERTY: &str = "data";

/// MIME type attached to `.tex` sources read from disk.
const TEX_MIME_TYPE: &str = "text/x-tex";

/// Run the full pipeline for one item.
///
/// Steps, in order: resolve parameters, acquire source, pre-flight scan,
/// create workspace, compile (inside the workspace), remove workspace,
/// package. The workspace is removed whether compilation succeeded or not.
///
/// # Errors
/// Any [`ConversionError`]; no partial output is ever returned.
pub async fn convert_item(
    item: &InputItem,
    index: usize,
    params: &dyn ParameterSource,
    compiler: &dyn LatexCompiler,
    config: &ConversionConfig,
) -> Result<ResultItem, ConversionError> {
    let start = Instant::now();
    info!("Item {}: starting", index);

    // ── Step 1: Resolve parameters ───────────────────────────────────────
    let request = ConversionRequest::resolve(params, index)?;

    // ── Step 2: Acquire source ───────────────────────────────────────────
    let source = input::acquire_source(&request.source, item)?;

    // ── Step 3: Pre-flight scan ──────────────────────────────────────────
    let warnings = preflight(&source, config.validation)?;

    // ── Step 4: Compile inside a scratch workspace ───────────────────────
    let workspace = Workspace::create()?;
    let options = request.compile_options(Some(workspace.path()));
    let compiled =
        compile::compile(compiler, &source, &options, config.compile_timeout_secs).await;
    workspace.cleanup();
    let pdf = compiled?;

    // ── Step 5: Package ──────────────────────────────────────────────────
    info!(
        "Item {}: {} bytes of PDF in {}ms",
        index,
        pdf.len(),
        start.elapsed().as_millis()
    );
    Ok(package::package_pdf(&pdf, &request.output_property, warnings))
}

/// Run one item and decide, via `continue_on_fail`, whether its failure is
/// recorded in the output or aborts the batch.
pub async fn process_item(
    item: &InputItem,
    index: usize,
    params: &dyn ParameterSource,
    compiler: &dyn LatexCompiler,
    config: &ConversionConfig,
    continue_on_fail: bool,
) -> Result<ResultItem, Latex2PdfError> {
    match convert_item(item, index, params, compiler, config).await {
        Ok(result) => Ok(result),
        Err(e) if continue_on_fail => {
            warn!("Item {} failed, continuing: {}", index, e);
            Ok(ResultItem::failure(&e))
        }
        Err(source) => Err(Latex2PdfError::ItemFailed { index, source }),
    }
}

/// Convert a batch of items.
///
/// # Returns
/// One result per item, in input order. Under continue-on-failure, failed
/// items hold `{success: false, error}`.
///
/// # Errors
/// [`Latex2PdfError::ItemFailed`] for the first failing item when
/// continue-on-failure is off. Items after it are not started (with
/// `concurrency > 1`, ones already in flight are cancelled).
pub async fn convert_batch(
    items: &[InputItem],
    params: &dyn ParameterSource,
    compiler: &dyn LatexCompiler,
    config: &ConversionConfig,
) -> Result<Vec<ResultItem>, Latex2PdfError> {
    let total = items.len();
    info!(
        "Starting batch: {} items, concurrency {}",
        total, config.concurrency
    );

    let callback = config.progress_callback.as_ref();
    if let Some(cb) = callback {
        cb.on_batch_start(total);
    }

    let results: Vec<ResultItem> = stream::iter(items.iter().enumerate())
        .map(move |(index, item)| async move {
            if let Some(cb) = callback {
                cb.on_item_start(index, total);
            }
            let outcome =
                process_item(item, index, params, compiler, config, config.continue_on_fail)
                    .await;
            if let Some(cb) = callback {
                report_item(cb.as_ref(), index, total, &outcome);
            }
            outcome
        })
        .buffered(config.concurrency)
        .try_collect()
        .await?;

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    info!("Batch complete: {}/{} items succeeded", succeeded, total);
    if let Some(cb) = callback {
        cb.on_batch_complete(total, succeeded);
    }

    Ok(results)
}

/// Synchronous wrapper around [`convert_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    items: &[InputItem],
    params: &dyn ParameterSource,
    compiler: &dyn LatexCompiler,
    config: &ConversionConfig,
) -> Result<Vec<ResultItem>, Latex2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Latex2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_batch(items, params, compiler, config))
}

// ── File helpers ─────────────────────────────────────────────────────────

/// Read a `.tex` file into an item, attached under [`FILE_PROPERTY`].
pub async fn load_tex_file(path: impl AsRef<Path>) -> Result<InputItem, Latex2PdfError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Latex2PdfError::InputReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input.tex".to_string());

    Ok(InputItem::new().with_binary(
        FILE_PROPERTY,
        encode::prepare_binary_data(&bytes, &file_name, TEX_MIME_TYPE),
    ))
}

/// `params` switched to read the source from [`FILE_PROPERTY`].
pub fn file_parameters(params: &NodeParameters) -> NodeParameters {
    params
        .clone()
        .with("inputType", "binary")
        .with("binaryPropertyName", FILE_PROPERTY)
}

/// Write a successful result's PDF to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_pdf(result: &ResultItem, path: impl AsRef<Path>) -> Result<(), Latex2PdfError> {
    let path = path.as_ref();
    let attachment = result.pdf().ok_or_else(|| {
        Latex2PdfError::Internal(format!(
            "No PDF to write to {}: {}",
            path.display(),
            result.error().unwrap_or("result has no attachment")
        ))
    })?;
    let pdf = encode::decode_bytes(attachment, "pdf")
        .map_err(|e| Latex2PdfError::Internal(e.to_string()))?;

    let write_err = |e: std::io::Error| Latex2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &pdf).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    debug!("Wrote {} ({} bytes)", path.display(), pdf.len());
    Ok(())
}

/// Compile one `.tex` file and write the PDF to `output_path`.
///
/// `params` supplies engine, passes and auxiliary directories; the input
/// selection is overridden to read the file.
pub async fn convert_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    params: &NodeParameters,
    compiler: &dyn LatexCompiler,
    config: &ConversionConfig,
) -> Result<PathBuf, Latex2PdfError> {
    let item = load_tex_file(input_path).await?;
    let params = file_parameters(params);
    let result = process_item(&item, 0, &params, compiler, config, false).await?;

    let output_path = output_path.as_ref();
    write_pdf(&result, output_path).await?;
    Ok(output_path.to_path_buf())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Apply the pre-flight policy. Returns the soft warnings to report on
/// success.
fn preflight(source: &str, policy: ValidationPolicy) -> Result<Vec<String>, ConversionError> {
    if policy == ValidationPolicy::Off {
        return Ok(Vec::new());
    }

    let result = validate_heuristic(source);
    for w in &result.warnings {
        debug!("Pre-flight: {}", w);
    }

    if !result.passes(policy) {
        return Err(ConversionError::ValidationFailed {
            warnings: result.messages(),
        });
    }
    Ok(result.soft_messages())
}

pub(crate) fn report_item(
    cb: &dyn ConversionProgressCallback,
    index: usize,
    total: usize,
    outcome: &Result<ResultItem, Latex2PdfError>,
) {
    match outcome {
        Ok(result) => match (result.file_size(), result.error()) {
            (Some(size), _) => cb.on_item_complete(index, total, size),
            (None, error) => cb.on_item_error(index, total, error.unwrap_or_default()),
        },
        Err(e) => cb.on_item_error(index, total, &e.to_string()),
    }
}
