//! Progress-callback trait for per-item conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the batch processes each item.
//!
//! # Example
//!
//! ```rust
//! use edgequake_latex2pdf::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize, pdf_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Item {}/{} done ({} bytes)", index + 1, total, pdf_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch driver as it processes each item.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Item indices are 0-based positions in the batch.
///
/// # Thread safety
///
/// With `concurrency > 1`, `on_item_start`, `on_item_complete` and
/// `on_item_error` may fire for several items at once and out of order.
/// Protect shared mutable state accordingly.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any item is processed.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before an item's parameters are resolved.
    fn on_item_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when an item produced a PDF.
    ///
    /// # Arguments
    /// * `pdf_len` — size of the produced PDF in bytes
    fn on_item_complete(&self, index: usize, total: usize, pdf_len: usize) {
        let _ = (index, total, pdf_len);
    }

    /// Called when an item failed, whether or not the batch continues.
    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after the last item, only when the batch ran to the end.
    ///
    /// # Arguments
    /// * `success_count` — items that produced a PDF
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::report_item;
    use crate::error::{ConversionError, Latex2PdfError};
    use crate::output::ResultItem;
    use crate::pipeline::package::package_pdf;
    use std::sync::Mutex;

    /// Records every event as a short string.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Recorder {
        fn push(&self, event: String) {
            self.0.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ConversionProgressCallback for Recorder {
        fn on_item_complete(&self, index: usize, _total: usize, pdf_len: usize) {
            self.push(format!("ok {index} {pdf_len}"));
        }

        fn on_item_error(&self, index: usize, _total: usize, error: &str) {
            self.push(format!("err {index} {error}"));
        }
    }

    #[test]
    fn noop_accepts_every_event() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(2);
        cb.on_item_start(0, 2);
        cb.on_item_complete(0, 2, 8);
        cb.on_item_error(1, 2, "Emergency stop.");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn settled_items_map_to_events() {
        let rec = Recorder::default();

        let pdf = package_pdf(b"%PDF-1.4", "data", Vec::new());
        report_item(&rec, 0, 3, &Ok(pdf));

        let handled = ResultItem::failure(&ConversionError::EmptyOutput);
        report_item(&rec, 1, 3, &Ok(handled));

        let fatal = Latex2PdfError::ItemFailed {
            index: 2,
            source: ConversionError::MissingBinaryData {
                property: "data".into(),
            },
        };
        report_item(&rec, 2, 3, &Err(fatal));

        let events = rec.events();
        assert_eq!(events[0], "ok 0 8");
        assert!(events[1].starts_with("err 1 "), "{}", events[1]);
        assert!(events[2].starts_with("err 2 Item 2: "), "{}", events[2]);
    }
}
