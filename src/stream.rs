//! Streaming conversion API: emit result items as they settle.
//!
//! Unlike the eager [`crate::convert::convert_batch`] which returns only after
//! every item finishes, [`convert_stream`] yields each [`ResultItem`] as soon
//! as it and all items before it are done. Order is always input order, even
//! with `concurrency > 1`.
//!
//! When continue-on-failure is off, the first failing item is yielded as
//! `Err` and the stream ends right after it.

use crate::config::{ConversionConfig, ParameterSource};
use crate::convert::{process_item, report_item};
use crate::error::Latex2PdfError;
use crate::output::{InputItem, ResultItem};
use crate::pipeline::compile::LatexCompiler;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-item results.
pub type ResultStream = Pin<Box<dyn Stream<Item = Result<ResultItem, Latex2PdfError>> + Send>>;

/// Convert a batch, streaming results in input order.
///
/// The stream owns everything it needs, so it can be moved into a spawned
/// task. `on_batch_complete` is not fired; the caller sees the end of the
/// stream instead.
///
/// # Example
/// ```rust,no_run
/// use edgequake_latex2pdf::{convert_stream, ConversionConfig, InputItem, NodeParameters, ProcessCompiler};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let params = NodeParameters::new().with("latexContent", "\\documentclass{article}\\begin{document}Hi\\end{document}");
/// let mut results = convert_stream(
///     vec![InputItem::new(), InputItem::new()],
///     Arc::new(params),
///     Arc::new(ProcessCompiler::new()),
///     ConversionConfig::default(),
/// );
/// while let Some(result) = results.next().await {
///     match result {
///         Ok(item) => println!("{}", serde_json::to_string(&item.json).unwrap()),
///         Err(e) => eprintln!("Error: {e}"),
///     }
/// }
/// # }
/// ```
pub fn convert_stream(
    items: Vec<InputItem>,
    params: Arc<dyn ParameterSource>,
    compiler: Arc<dyn LatexCompiler>,
    config: ConversionConfig,
) -> ResultStream {
    let total = items.len();
    let concurrency = config.concurrency;
    info!("Starting streaming batch: {} items", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let results = stream::iter(items.into_iter().enumerate())
        .map(move |(index, item)| {
            let params = Arc::clone(&params);
            let compiler = Arc::clone(&compiler);
            let cfg = config.clone();
            async move {
                if let Some(ref cb) = cfg.progress_callback {
                    cb.on_item_start(index, total);
                }
                let outcome = process_item(
                    &item,
                    index,
                    params.as_ref(),
                    compiler.as_ref(),
                    &cfg,
                    cfg.continue_on_fail,
                )
                .await;
                if let Some(ref cb) = cfg.progress_callback {
                    report_item(cb.as_ref(), index, total, &outcome);
                }
                outcome
            }
        })
        .buffered(concurrency);

    // Stop pulling items once one has failed fatally.
    let s = stream::unfold(
        (Box::pin(results), false),
        |(mut results, aborted)| async move {
            if aborted {
                return None;
            }
            let outcome = results.next().await?;
            let aborted = outcome.is_err();
            Some((outcome, (results, aborted)))
        },
    );

    Box::pin(s)
}
