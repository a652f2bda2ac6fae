//! Item types exchanged with the workflow host.
//!
//! The shapes follow the host's item contract: every item carries a JSON
//! object plus a map of named binary attachments whose payload travels as
//! base64 text. Field names serialise in camelCase so a batch can be read
//! from, and written back to, the host's own JSON.

use crate::error::{ConversionError, ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A named binary attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryData {
    /// Base64-encoded payload.
    pub data: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    /// Human-readable size, e.g. `"12.4 kB"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
}

/// One item of the incoming batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputItem {
    #[serde(default)]
    pub json: Map<String, Value>,
    #[serde(default)]
    pub binary: BTreeMap<String, BinaryData>,
}

impl InputItem {
    /// An item holding inline JSON only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a binary payload, builder-style.
    pub fn with_binary(mut self, property: impl Into<String>, data: BinaryData) -> Self {
        self.binary.insert(property.into(), data);
        self
    }

    /// Look up a binary payload that must exist.
    pub fn assert_binary_data(&self, property: &str) -> Result<&BinaryData, ConversionError> {
        self.binary
            .get(property)
            .ok_or_else(|| ConversionError::MissingBinaryData {
                property: property.to_string(),
            })
    }
}

/// Summary of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessSummary {
    pub success: bool,
    pub filename: String,
    pub mime_type: String,
    /// PDF size in bytes.
    pub file_size: usize,
    /// Soft pre-flight warnings; omitted entirely when there are none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Summary of an item that failed under continue-on-failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSummary {
    pub success: bool,
    pub error: String,
    /// Error family, for callers that branch on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

/// The JSON half of a [`ResultItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemSummary {
    Success(SuccessSummary),
    Failure(FailureSummary),
}

/// Exactly one of these is produced per input item, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    pub json: ItemSummary,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary: BTreeMap<String, BinaryData>,
}

impl ResultItem {
    /// A failed item's slot in the output.
    pub fn failure(error: &ConversionError) -> Self {
        ResultItem {
            json: ItemSummary::Failure(FailureSummary {
                success: false,
                error: error.to_string(),
                error_kind: Some(error.kind()),
            }),
            binary: BTreeMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.json, ItemSummary::Success(_))
    }

    /// The produced PDF attachment, if any.
    pub fn pdf(&self) -> Option<&BinaryData> {
        self.binary.values().next()
    }

    /// PDF size in bytes of a successful item.
    pub fn file_size(&self) -> Option<usize> {
        match &self.json {
            ItemSummary::Success(s) => Some(s.file_size),
            ItemSummary::Failure(_) => None,
        }
    }

    /// Error text of a failed item.
    pub fn error(&self) -> Option<&str> {
        match &self.json {
            ItemSummary::Failure(f) => Some(&f.error),
            ItemSummary::Success(_) => None,
        }
    }
}
