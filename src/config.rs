//! Configuration types for LaTeX-to-PDF conversion.
//!
//! Two layers of configuration exist, mirroring how a workflow host drives
//! the pipeline:
//!
//! * [`ConversionConfig`] — batch-wide behaviour (failure policy, pre-flight
//!   policy, concurrency, timeout). Built once via [`ConversionConfigBuilder`].
//! * [`ConversionRequest`] — what to do with *one* item. Resolved fresh for
//!   every item from a [`ParameterSource`], because hosts evaluate parameter
//!   expressions per item.
//!
//! # Design choice: builder over constructor
//! The batch settings follow the same builder shape as the rest of the
//! edgequake crates: callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::{ConversionError, Latex2PdfError};
use crate::pipeline::compile::CompileOptions;
use crate::progress::ProgressCallback;
use crate::templates::DEFAULT_LATEX_CONTENT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

// ── Batch configuration ──────────────────────────────────────────────────

/// Batch-wide settings for a conversion run.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_latex2pdf::{ConversionConfig, ValidationPolicy};
///
/// let config = ConversionConfig::builder()
///     .continue_on_fail(true)
///     .validation(ValidationPolicy::Strict)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Record a failed item as `{success: false, error}` and move on, instead
    /// of aborting the whole batch. Default: false.
    pub continue_on_fail: bool,

    /// How the heuristic pre-flight scan gates compilation. Default: [`ValidationPolicy::Lenient`].
    pub validation: ValidationPolicy,

    /// Number of items compiled at the same time. Default: 1.
    ///
    /// Results are always emitted in input order regardless of this value.
    /// Each item owns its own scratch directory, so raising it is safe; it is
    /// bounded in practice by how many TeX processes the machine can host.
    pub concurrency: usize,

    /// Per-item compile timeout in seconds. Default: None (wait forever).
    ///
    /// A TeX engine waiting on terminal input never returns on its own.
    /// When set, the child process is killed once the limit elapses and the
    /// item fails with [`ConversionError::CompileTimeout`].
    pub compile_timeout_secs: Option<u64>,

    /// Optional per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            continue_on_fail: false,
            validation: ValidationPolicy::default(),
            concurrency: 1,
            compile_timeout_secs: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("continue_on_fail", &self.continue_on_fail)
            .field("validation", &self.validation)
            .field("concurrency", &self.concurrency)
            .field("compile_timeout_secs", &self.compile_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn continue_on_fail(mut self, v: bool) -> Self {
        self.config.continue_on_fail = v;
        self
    }

    pub fn validation(mut self, policy: ValidationPolicy) -> Self {
        self.config.validation = policy;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn compile_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compile_timeout_secs = Some(secs);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Latex2PdfError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Latex2PdfError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.compile_timeout_secs == Some(0) {
            return Err(Latex2PdfError::InvalidConfig(
                "Compile timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Gate applied to the heuristic pre-flight scan.
///
/// | Policy | Scan runs | Item fails when |
/// |--------|-----------|-----------------|
/// | `Off`     | no  | never |
/// | `Lenient` | yes | a structural marker is missing (default) |
/// | `Strict`  | yes | any warning at all |
///
/// Soft warnings (custom document class, bibliography) that do not fail the
/// item are reported in the result's `warnings` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    Off,
    #[default]
    Lenient,
    Strict,
}

/// The TeX engine binary to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatexEngine {
    #[default]
    Pdflatex,
    Xelatex,
    Lualatex,
}

impl LatexEngine {
    /// Binary name passed to the process spawner.
    pub fn as_str(&self) -> &'static str {
        match self {
            LatexEngine::Pdflatex => "pdflatex",
            LatexEngine::Xelatex => "xelatex",
            LatexEngine::Lualatex => "lualatex",
        }
    }
}

impl fmt::Display for LatexEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LatexEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdflatex" => Ok(LatexEngine::Pdflatex),
            "xelatex" => Ok(LatexEngine::Xelatex),
            "lualatex" => Ok(LatexEngine::Lualatex),
            other => Err(format!(
                "unknown LaTeX command '{other}' (expected pdflatex, xelatex or lualatex)"
            )),
        }
    }
}

/// Where an item's LaTeX source comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatexSource {
    /// Inline source text.
    Text(String),
    /// A base64 binary payload on the item, by property name.
    Binary { property: String },
}

// ── Parameter access ─────────────────────────────────────────────────────

/// Read access to the host's per-item parameters.
///
/// The host may evaluate expressions differently for each item, so every
/// lookup carries the item index. `None` means "not set"; the resolver then
/// applies the documented default.
pub trait ParameterSource: Send + Sync {
    fn parameter(&self, name: &str, item_index: usize) -> Option<&Value>;
}

/// A flat parameter object shared by every item of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeParameters(pub Map<String, Value>);

impl NodeParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, builder-style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl ParameterSource for NodeParameters {
    fn parameter(&self, name: &str, _item_index: usize) -> Option<&Value> {
        self.0.get(name)
    }
}

/// One parameter object per item, by position.
impl ParameterSource for Vec<NodeParameters> {
    fn parameter(&self, name: &str, item_index: usize) -> Option<&Value> {
        self.get(item_index).and_then(|p| p.0.get(name))
    }
}

/// Entries of the `additionalOptions.option[]` collection.
#[derive(Debug, Clone, Default, Deserialize)]
struct AdditionalOptions {
    #[serde(default)]
    option: Vec<AuxiliaryOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AuxiliaryOption {
    #[serde(default)]
    inputs: Option<String>,
    #[serde(default)]
    fonts: Option<String>,
}

// ── Per-item request ─────────────────────────────────────────────────────

/// Everything needed to convert one item, resolved from its parameters.
///
/// Immutable once built and discarded when the item settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: LatexSource,
    pub engine: LatexEngine,
    /// Forwarded to the compiler; always ≥ 1.
    pub passes: u32,
    /// Extra directory searched for `\input`/`\includegraphics` assets.
    pub inputs: Option<String>,
    /// Extra directory searched for fonts (fontspec).
    pub fonts: Option<String>,
    /// Binary property the PDF is stored under.
    pub output_property: String,
}

impl ConversionRequest {
    /// Resolve the request for item `item_index`.
    ///
    /// Fails with a configuration error before anything touches the disk.
    pub fn resolve(
        params: &dyn ParameterSource,
        item_index: usize,
    ) -> Result<Self, ConversionError> {
        let resource = string_param(params, "resource", item_index)?
            .unwrap_or_else(|| "document".to_string());
        let operation = string_param(params, "operation", item_index)?
            .unwrap_or_else(|| "convert".to_string());
        if resource != "document" || operation != "convert" {
            return Err(ConversionError::UnsupportedOperation {
                resource,
                operation,
            });
        }

        let input_type = string_param(params, "inputType", item_index)?
            .unwrap_or_else(|| "text".to_string());
        let source = match input_type.as_str() {
            "text" => LatexSource::Text(
                string_param(params, "latexContent", item_index)?
                    .unwrap_or_else(|| DEFAULT_LATEX_CONTENT.to_string()),
            ),
            "binary" => LatexSource::Binary {
                property: property_name(params, "binaryPropertyName", item_index)?,
            },
            other => {
                return Err(ConversionError::invalid_parameter(
                    "inputType",
                    format!("expected 'text' or 'binary', got '{other}'"),
                ))
            }
        };

        let output_property = property_name(params, "outputBinaryPropertyName", item_index)?;

        let engine = match string_param(params, "latexCmd", item_index)? {
            Some(cmd) => cmd
                .parse::<LatexEngine>()
                .map_err(|reason| ConversionError::invalid_parameter("latexCmd", reason))?,
            None => LatexEngine::default(),
        };

        let passes = passes_param(params, item_index)?;
        let (inputs, fonts) = auxiliary_dirs(params, item_index)?;

        let request = ConversionRequest {
            source,
            engine,
            passes,
            inputs,
            fonts,
            output_property,
        };
        debug!("Item {}: resolved {:?}", item_index, request);
        Ok(request)
    }

    /// Options handed to the compiler for this item.
    pub fn compile_options(&self, work_dir: Option<&Path>) -> CompileOptions {
        CompileOptions {
            cmd: self.engine,
            passes: self.passes,
            args: CompileOptions::default_args(),
            inputs: self.inputs.clone(),
            fonts: self.fonts.clone(),
            work_dir: work_dir.map(Path::to_path_buf),
        }
    }
}

/// Default property name for both the input and output binary fields.
pub const DEFAULT_BINARY_PROPERTY: &str = "data";

fn string_param(
    params: &dyn ParameterSource,
    name: &str,
    item_index: usize,
) -> Result<Option<String>, ConversionError> {
    match params.parameter(name, item_index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConversionError::invalid_parameter(
            name,
            format!("expected a string, got {other}"),
        )),
    }
}

/// A binary property name: defaults to `data`, but an explicit empty value
/// is an error.
fn property_name(
    params: &dyn ParameterSource,
    name: &str,
    item_index: usize,
) -> Result<String, ConversionError> {
    match string_param(params, name, item_index)? {
        None => Ok(DEFAULT_BINARY_PROPERTY.to_string()),
        Some(s) if s.trim().is_empty() => Err(ConversionError::invalid_parameter(
            name,
            "must not be empty",
        )),
        Some(s) => Ok(s),
    }
}

fn passes_param(params: &dyn ParameterSource, item_index: usize) -> Result<u32, ConversionError> {
    let value = match params.parameter("passes", item_index) {
        None | Some(Value::Null) => return Ok(1),
        Some(v) => v,
    };

    let passes = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        _ => None,
    }
    .ok_or_else(|| {
        ConversionError::invalid_parameter("passes", format!("expected a whole number, got {value}"))
    })?;

    if passes == 0 {
        return Err(ConversionError::invalid_parameter("passes", "must be at least 1"));
    }
    u32::try_from(passes)
        .map_err(|_| ConversionError::invalid_parameter("passes", format!("{passes} is too large")))
}

/// Fold `additionalOptions.option[]` into a single inputs/fonts pair.
///
/// Later entries override earlier ones; empty strings are ignored.
fn auxiliary_dirs(
    params: &dyn ParameterSource,
    item_index: usize,
) -> Result<(Option<String>, Option<String>), ConversionError> {
    let options: AdditionalOptions = match params.parameter("additionalOptions", item_index) {
        None | Some(Value::Null) => return Ok((None, None)),
        Some(v) => AdditionalOptions::deserialize(v).map_err(|e| {
            ConversionError::invalid_parameter("additionalOptions", e.to_string())
        })?,
    };

    let mut inputs = None;
    let mut fonts = None;
    for option in options.option {
        if let Some(dir) = option.inputs.filter(|s| !s.is_empty()) {
            inputs = Some(dir);
        }
        if let Some(dir) = option.fonts.filter(|s| !s.is_empty()) {
            fonts = Some(dir);
        }
    }
    Ok((inputs, fonts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: Value) -> NodeParameters {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let req = ConversionRequest::resolve(&NodeParameters::new(), 0).unwrap();
        assert_eq!(req.source, LatexSource::Text(DEFAULT_LATEX_CONTENT.to_string()));
        assert_eq!(req.engine, LatexEngine::Pdflatex);
        assert_eq!(req.passes, 1);
        assert_eq!(req.output_property, "data");
        assert_eq!(req.inputs, None);
        assert_eq!(req.fonts, None);
    }

    #[test]
    fn binary_mode_reads_property_name() {
        let p = params(json!({
            "inputType": "binary",
            "binaryPropertyName": "tex",
            "outputBinaryPropertyName": "pdf",
            "latexCmd": "xelatex",
            "passes": 2
        }));
        let req = ConversionRequest::resolve(&p, 0).unwrap();
        assert_eq!(req.source, LatexSource::Binary { property: "tex".into() });
        assert_eq!(req.output_property, "pdf");
        assert_eq!(req.engine, LatexEngine::Xelatex);
        assert_eq!(req.passes, 2);
    }

    #[test]
    fn empty_output_property_is_configuration_error() {
        let p = params(json!({ "outputBinaryPropertyName": "  " }));
        let err = ConversionRequest::resolve(&p, 0).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidParameter { ref name, .. } if name == "outputBinaryPropertyName"));
    }

    #[test]
    fn empty_binary_property_is_configuration_error() {
        let p = params(json!({ "inputType": "binary", "binaryPropertyName": "" }));
        assert!(ConversionRequest::resolve(&p, 0).is_err());
    }

    #[test]
    fn rejects_unknown_engine_and_bad_passes() {
        let p = params(json!({ "latexCmd": "tectonic" }));
        assert!(ConversionRequest::resolve(&p, 0).is_err());

        for bad in [json!(0), json!(-1), json!(1.5), json!("2")] {
            let p = params(json!({ "passes": bad }));
            assert!(ConversionRequest::resolve(&p, 0).is_err(), "passes={bad}");
        }

        let p = params(json!({ "passes": 3.0 }));
        assert_eq!(ConversionRequest::resolve(&p, 0).unwrap().passes, 3);
    }

    #[test]
    fn rejects_unsupported_operation() {
        let p = params(json!({ "resource": "document", "operation": "render" }));
        let err = ConversionRequest::resolve(&p, 0).unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedOperation { .. }));
    }

    #[test]
    fn additional_options_last_non_empty_wins() {
        let p = params(json!({
            "additionalOptions": {
                "option": [
                    { "inputs": "/assets/a", "fonts": "/fonts" },
                    { "inputs": "/assets/b", "fonts": "" }
                ]
            }
        }));
        let req = ConversionRequest::resolve(&p, 0).unwrap();
        assert_eq!(req.inputs.as_deref(), Some("/assets/b"));
        assert_eq!(req.fonts.as_deref(), Some("/fonts"));
    }

    #[test]
    fn per_item_parameters_follow_index() {
        let per_item = vec![
            params(json!({ "latexCmd": "pdflatex" })),
            params(json!({ "latexCmd": "lualatex" })),
        ];
        assert_eq!(
            ConversionRequest::resolve(&per_item, 1).unwrap().engine,
            LatexEngine::Lualatex
        );
    }

    #[test]
    fn compile_options_carry_request_fields() {
        let p = params(json!({ "passes": 2, "additionalOptions": { "option": [{ "fonts": "/f" }] } }));
        let req = ConversionRequest::resolve(&p, 0).unwrap();
        let opts = req.compile_options(Some(Path::new("/tmp/scratch")));
        assert_eq!(opts.cmd, LatexEngine::Pdflatex);
        assert_eq!(opts.passes, 2);
        assert_eq!(opts.args, vec!["-halt-on-error".to_string()]);
        assert_eq!(opts.fonts.as_deref(), Some("/f"));
        assert_eq!(opts.work_dir.as_deref(), Some(Path::new("/tmp/scratch")));
    }

    #[test]
    fn builder_validates() {
        assert!(ConversionConfig::builder().concurrency(0).build().is_err());
        assert!(ConversionConfig::builder().compile_timeout_secs(0).build().is_err());
        let c = ConversionConfig::builder().concurrency(4).build().unwrap();
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.validation, ValidationPolicy::Lenient);
        assert!(!c.continue_on_fail);
    }

    #[test]
    fn engine_round_trips_through_str() {
        for e in [LatexEngine::Pdflatex, LatexEngine::Xelatex, LatexEngine::Lualatex] {
            assert_eq!(e.as_str().parse::<LatexEngine>().unwrap(), e);
        }
    }
}
