//! Result packaging: wrap the finished PDF as the item's output.
//!
//! The result carries only the new attachment. Whatever binaries the input
//! item had are not forwarded.

use crate::output::{ItemSummary, ResultItem, SuccessSummary};
use crate::pipeline::encode::prepare_binary_data;
use crate::templates::PDF_MIME_TYPE;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Build the success result for one item.
///
/// `warnings` are the soft pre-flight findings; an empty list leaves the
/// `warnings` key out of the summary entirely.
pub fn package_pdf(pdf: &[u8], output_property: &str, warnings: Vec<String>) -> ResultItem {
    let filename = output_file_name();
    let attachment = prepare_binary_data(pdf, &filename, PDF_MIME_TYPE);

    let mut binary = BTreeMap::new();
    binary.insert(output_property.to_string(), attachment);

    ResultItem {
        json: ItemSummary::Success(SuccessSummary {
            success: true,
            filename,
            mime_type: PDF_MIME_TYPE.to_string(),
            file_size: pdf.len(),
            warnings,
        }),
        binary,
    }
}

/// `output-<unix millis>.pdf`. Uniqueness is not guaranteed.
fn output_file_name() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("output-{millis}.pdf")
}
