//! Content acquisition: turn an item's source selection into LaTeX text.
//!
//! Text mode hands the inline parameter through untouched. Binary mode looks
//! up the referenced attachment on the item (a missing attachment is a
//! configuration error, raised before any process is spawned) and decodes it
//! base64 → UTF-8 unconditionally.

use crate::config::LatexSource;
use crate::error::ConversionError;
use crate::output::InputItem;
use crate::pipeline::encode;
use tracing::debug;

/// Resolve the LaTeX source for one item.
pub fn acquire_source(source: &LatexSource, item: &InputItem) -> Result<String, ConversionError> {
    match source {
        LatexSource::Text(text) => Ok(text.clone()),
        LatexSource::Binary { property } => {
            let binary = item.assert_binary_data(property)?;
            let text = encode::decode_text(binary, property)?;
            debug!(
                "Decoded binary property '{}' → {} bytes of LaTeX",
                property,
                text.len()
            );
            Ok(text)
        }
    }
}
