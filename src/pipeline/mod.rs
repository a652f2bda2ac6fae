//! Pipeline stages for LaTeX-to-PDF conversion.
//!
//! Each submodule implements exactly one step of the per-item flow, so each
//! can be tested on its own and the compiler can be swapped without touching
//! the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ validate ──▶ workspace ──▶ compile ──▶ package
//! (text/b64)  (lint)      (tempdir)    (engine)    (base64 PDF)
//!                                         │
//!                                       hints (error enrichment)
//! ```
//!
//! 1. [`input`]     — pick inline text or decode the referenced attachment
//! 2. [`validate`]  — heuristic pre-flight scan; hard vs soft warnings
//! 3. [`workspace`] — per-item scratch directory, always removed afterwards
//! 4. [`compile`]   — drive a [`compile::LatexCompiler`] stream to a byte
//!    buffer; the only stage that spawns processes
//! 5. [`package`]   — wrap the PDF as the item's result attachment
//!
//! [`encode`] holds the base64 helpers used by both ends; [`hints`] turns raw
//! compiler errors into user-facing messages.

pub mod compile;
pub mod encode;
pub mod hints;
pub mod input;
pub mod package;
pub mod validate;
pub mod workspace;
