//! Fixed text used by the pipeline.
//!
//! All user-facing boilerplate lives here so the guidance can be reworded
//! without touching the matching logic in [`crate::pipeline::hints`].

/// Source used when an item selects text input but sets no `latexContent`.
pub const DEFAULT_LATEX_CONTENT: &str =
    "\\documentclass{article}\n\\begin{document}\nHello World!\n\\end{document}";

/// Prefix of every compiler error message.
pub const COMPILATION_FAILED_PREFIX: &str = "LaTeX compilation failed: ";

/// Appended when the compiler reports a missing file, class or package.
pub const MISSING_RESOURCE_HINT: &str = "\n\nSuggestions:\n\
- Install the missing package or document class with your TeX distribution's \
package manager (tlmgr install <package> for TeX Live, the MiKTeX Console for MiKTeX).\n\
- If the file is part of your project, place it in a directory and pass that \
directory as the Inputs Directory option.\n\
- Check the spelling of \\documentclass, \\usepackage and \\input arguments.";

/// Appended when the compiler reports an undefined control sequence.
pub const UNDEFINED_CONTROL_SEQUENCE_HINT: &str = "\n\nSuggestions:\n\
- Check the command for typos.\n\
- Make sure the package that defines the command is loaded with \\usepackage.\n\
- Commands defined with \\newcommand must be defined before they are used.";

/// Mime type of every produced attachment.
pub const PDF_MIME_TYPE: &str = "application/pdf";
