//! Pre-flight scan: cheap heuristics run on the source before spawning TeX.
//!
//! ## This is a lint, not a parser
//!
//! Every check is a substring or regex match over the raw text. Comments,
//! `verbatim` blocks and escaped contexts are not understood, so a marker that
//! only appears inside `% ...` still counts as present, and a `\bibliography`
//! mentioned in a comment still raises the bibliography warning. Keep it that
//! way: callers rely on the warning set being exactly what these patterns
//! produce.
//!
//! ## Checks
//!
//! 1. Structural markers: `\documentclass`, `\begin{document}`,
//!    `\end{document}`. Each missing one adds a *hard* warning.
//! 2. Every `\documentclass[..]{name}` whose `name` is not a standard class
//!    adds a *soft* warning.
//! 3. Any bibliography command anywhere adds one *soft* warning.
//!
//! The scan passes when every warning is soft.

use crate::config::ValidationPolicy;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Document classes that ship with every TeX distribution.
pub const STANDARD_DOCUMENT_CLASSES: [&str; 5] = ["article", "book", "report", "letter", "beamer"];

/// Commands that imply an external bibliography database.
pub const BIBLIOGRAPHY_COMMANDS: [&str; 3] =
    ["\\bibliography", "\\addbibresource", "\\printbibliography"];

static RE_DOCUMENT_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\documentclass\s*(?:\[[^\]]*\])?\s*\{([^}]*)\}").unwrap()
});

/// One finding of the pre-flight scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    MissingDocumentClass,
    MissingBeginDocument,
    MissingEndDocument,
    /// A `\documentclass` outside [`STANDARD_DOCUMENT_CLASSES`].
    CustomDocumentClass(String),
    /// A command from [`BIBLIOGRAPHY_COMMANDS`] was found.
    Bibliography,
}

impl ValidationWarning {
    /// Soft warnings are reported but never fail the lenient policy.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            ValidationWarning::CustomDocumentClass(_) | ValidationWarning::Bibliography
        )
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::MissingDocumentClass => {
                f.write_str("Missing \\documentclass declaration")
            }
            ValidationWarning::MissingBeginDocument => f.write_str("Missing \\begin{document}"),
            ValidationWarning::MissingEndDocument => f.write_str("Missing \\end{document}"),
            ValidationWarning::CustomDocumentClass(name) => write!(
                f,
                "Custom document class '{name}' detected. Make sure it is installed or \
                 available in the Inputs Directory"
            ),
            ValidationWarning::Bibliography => f.write_str(
                "Bibliography commands detected. Make sure the bibliography files are \
                 available and enough passes are configured",
            ),
        }
    }
}

/// Outcome of [`validate_heuristic`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    /// Findings in scan order.
    pub warnings: Vec<ValidationWarning>,
    /// `true` when there are no warnings or all of them are soft.
    pub passed: bool,
}

impl ValidationResult {
    /// Whether the item may proceed under `policy`.
    pub fn passes(&self, policy: ValidationPolicy) -> bool {
        match policy {
            ValidationPolicy::Off => true,
            ValidationPolicy::Lenient => self.passed,
            ValidationPolicy::Strict => self.warnings.is_empty(),
        }
    }

    /// All warnings rendered as text.
    pub fn messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    /// Soft warnings rendered as text (what ends up in a successful result).
    pub fn soft_messages(&self) -> Vec<String> {
        self.warnings
            .iter()
            .filter(|w| w.is_soft())
            .map(ToString::to_string)
            .collect()
    }
}

/// Run the heuristic scan over `source`.
pub fn validate_heuristic(source: &str) -> ValidationResult {
    let mut warnings = Vec::new();

    if !source.contains("\\documentclass") {
        warnings.push(ValidationWarning::MissingDocumentClass);
    }
    if !source.contains("\\begin{document}") {
        warnings.push(ValidationWarning::MissingBeginDocument);
    }
    if !source.contains("\\end{document}") {
        warnings.push(ValidationWarning::MissingEndDocument);
    }

    for caps in RE_DOCUMENT_CLASS.captures_iter(source) {
        let class = caps[1].trim();
        if !STANDARD_DOCUMENT_CLASSES.contains(&class) {
            warnings.push(ValidationWarning::CustomDocumentClass(class.to_string()));
        }
    }

    if BIBLIOGRAPHY_COMMANDS.iter().any(|cmd| source.contains(cmd)) {
        warnings.push(ValidationWarning::Bibliography);
    }

    let passed = warnings.iter().all(ValidationWarning::is_soft);
    ValidationResult { warnings, passed }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "\\documentclass{article}\n\\begin{document}\nHi\n\\end{document}";

    #[test]
    fn complete_standard_document_is_clean() {
        let r = validate_heuristic(MINIMAL);
        assert!(r.warnings.is_empty());
        assert!(r.passed);
    }

    #[test]
    fn missing_begin_document_always_fails() {
        let cases = [
            "\\documentclass{article}\nHi\n\\end{document}",
            "\\documentclass{mycustomclass}\n\\bibliography{refs}\n\\end{document}",
            "",
        ];
        for src in cases {
            let r = validate_heuristic(src);
            assert!(!r.passed, "should fail: {src:?}");
            assert!(r.warnings.contains(&ValidationWarning::MissingBeginDocument));
        }
    }

    #[test]
    fn empty_source_reports_all_three_markers() {
        let r = validate_heuristic("");
        assert_eq!(
            r.warnings,
            vec![
                ValidationWarning::MissingDocumentClass,
                ValidationWarning::MissingBeginDocument,
                ValidationWarning::MissingEndDocument,
            ]
        );
    }

    #[test]
    fn standard_classes_never_warn() {
        for class in STANDARD_DOCUMENT_CLASSES {
            let src = format!("\\documentclass[11pt,a4paper]{{{class}}}\\begin{{document}}\\end{{document}}");
            assert!(validate_heuristic(&src).warnings.is_empty(), "{class}");
        }
    }

    #[test]
    fn custom_class_warns_but_passes() {
        let src = MINIMAL.replace("article", "mycustomclass");
        let r = validate_heuristic(&src);
        assert_eq!(
            r.warnings,
            vec![ValidationWarning::CustomDocumentClass("mycustomclass".into())]
        );
        assert!(r.passed);
        assert!(r.messages()[0].contains("mycustomclass"));
    }

    #[test]
    fn bibliography_warns_once() {
        let src = MINIMAL.replace(
            "Hi",
            "\\addbibresource{refs.bib}\\cite{x}\\printbibliography",
        );
        let r = validate_heuristic(&src);
        assert_eq!(r.warnings, vec![ValidationWarning::Bibliography]);
        assert!(r.passed);
    }

    #[test]
    fn commented_markers_still_count() {
        // Heuristic: comments are not understood.
        let src = "% \\documentclass{article} \\begin{document} \\end{document}";
        assert!(validate_heuristic(src).warnings.is_empty());
    }

    #[test]
    fn policies() {
        let soft = validate_heuristic(&MINIMAL.replace("article", "memoir"));
        assert!(soft.passes(ValidationPolicy::Lenient));
        assert!(!soft.passes(ValidationPolicy::Strict));

        let hard = validate_heuristic("Hello");
        assert!(!hard.passes(ValidationPolicy::Lenient));
        assert!(hard.passes(ValidationPolicy::Off));
    }

    #[test]
    fn soft_messages_exclude_structural() {
        let r = validate_heuristic("\\documentclass{memoir}");
        assert_eq!(r.messages().len(), 3);
        assert_eq!(r.soft_messages().len(), 1);
    }
}
