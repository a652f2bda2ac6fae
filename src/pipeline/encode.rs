//! Binary payload encoding: raw bytes ⇄ base64 [`BinaryData`].
//!
//! The host moves attachments around as base64 text inside JSON, so both ends
//! of the pipeline pass through here: the incoming `.tex` payload is decoded
//! to UTF-8 source, and the outgoing PDF is wrapped the same way.

use crate::error::ConversionError;
use crate::output::BinaryData;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::{debug, warn};

/// Wrap raw bytes as a host attachment.
pub fn prepare_binary_data(bytes: &[u8], file_name: &str, mime_type: &str) -> BinaryData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} → {} bytes base64", file_name, b64.len());

    BinaryData {
        data: b64,
        mime_type: mime_type.to_string(),
        file_name: Some(file_name.to_string()),
        file_extension: Path::new(file_name)
            .extension()
            .map(|e| e.to_string_lossy().into_owned()),
        file_size: Some(human_size(bytes.len())),
    }
}

/// Decode an attachment's raw bytes.
pub fn decode_bytes(binary: &BinaryData, property: &str) -> Result<Vec<u8>, ConversionError> {
    STANDARD
        .decode(binary.data.trim())
        .map_err(|e| ConversionError::InvalidBinaryData {
            property: property.to_string(),
            reason: format!("invalid base64: {e}"),
        })
}

/// Decode an attachment as UTF-8 text. No charset negotiation is attempted:
/// invalid sequences become U+FFFD and the source is compiled anyway.
pub fn decode_text(binary: &BinaryData, property: &str) -> Result<String, ConversionError> {
    let bytes = decode_bytes(binary, property)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(
                "Binary property '{}' is not valid UTF-8 ({}), decoding lossily",
                property,
                e.utf8_error()
            );
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Decimal (kB = 1000 B) size string, one decimal place above a kilobyte.
fn human_size(len: usize) -> String {
    const UNITS: [&str; 4] = ["kB", "MB", "GB", "TB"];
    if len < 1000 {
        return format!("{len} B");
    }
    let mut size = len as f64;
    let mut unit = "B";
    for u in UNITS {
        if size < 1000.0 {
            break;
        }
        size /= 1000.0;
        unit = u;
    }
    format!("{size:.1} {unit}")
}
