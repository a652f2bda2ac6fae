//! Error enrichment: append human guidance to raw compiler messages.
//!
//! TeX error text is terse ("File `mypkg.sty' not found."). The two failure
//! families users hit most often get a fixed block of suggestions appended.
//! Matching is plain substring search over the message and the result is
//! plain concatenation. There is no structured error classification here.
//!
//! ## Rules
//!
//! 1. Every message gets the [`COMPILATION_FAILED_PREFIX`].
//! 2. A message mentioning `not found`, `.cls` or `.sty` gets
//!    [`MISSING_RESOURCE_HINT`].
//! 3. A message mentioning `Undefined control sequence` gets
//!    [`UNDEFINED_CONTROL_SEQUENCE_HINT`].
//!
//! Rules 2 and 3 are independent; a message matching both gets both blocks.

use crate::templates::{
    COMPILATION_FAILED_PREFIX, MISSING_RESOURCE_HINT, UNDEFINED_CONTROL_SEQUENCE_HINT,
};

const MISSING_RESOURCE_MARKERS: [&str; 3] = ["not found", ".cls", ".sty"];
const UNDEFINED_CONTROL_SEQUENCE: &str = "Undefined control sequence";

/// Build the user-facing message for a compiler error.
pub fn enrich_compiler_error(raw: &str) -> String {
    let mut message = format!("{COMPILATION_FAILED_PREFIX}{raw}");

    if MISSING_RESOURCE_MARKERS.iter().any(|m| raw.contains(m)) {
        message.push_str(MISSING_RESOURCE_HINT);
    }
    if raw.contains(UNDEFINED_CONTROL_SEQUENCE) {
        message.push_str(UNDEFINED_CONTROL_SEQUENCE_HINT);
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sty_gets_package_guidance() {
        let msg = enrich_compiler_error("mypkg.sty not found");
        assert!(msg.starts_with(COMPILATION_FAILED_PREFIX));
        assert!(msg.contains("mypkg.sty not found"));
        assert!(msg.contains(MISSING_RESOURCE_HINT));
        assert!(!msg.contains(UNDEFINED_CONTROL_SEQUENCE_HINT));
    }

    #[test]
    fn cls_without_not_found_still_matches() {
        let msg = enrich_compiler_error("cannot open fancy.cls");
        assert!(msg.contains(MISSING_RESOURCE_HINT));
    }

    #[test]
    fn undefined_control_sequence_gets_its_block() {
        let msg = enrich_compiler_error("! Undefined control sequence.\nl.3 \\foo");
        assert!(msg.contains(UNDEFINED_CONTROL_SEQUENCE_HINT));
        assert!(!msg.contains(MISSING_RESOURCE_HINT));
    }

    #[test]
    fn both_blocks_when_both_match() {
        let msg = enrich_compiler_error("Undefined control sequence; x.sty");
        assert!(msg.contains(MISSING_RESOURCE_HINT));
        assert!(msg.contains(UNDEFINED_CONTROL_SEQUENCE_HINT));
    }

    #[test]
    fn unrelated_message_only_prefixed() {
        let msg = enrich_compiler_error("Emergency stop.");
        assert_eq!(msg, format!("{COMPILATION_FAILED_PREFIX}Emergency stop."));
    }
}
