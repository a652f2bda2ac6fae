//! End-to-end integration tests for edgequake-latex2pdf.
//!
//! These tests spawn a real TeX engine. They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested, and each one also skips when its engine is not on
//! `PATH`.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use edgequake_latex2pdf::pipeline::encode::decode_bytes;
use edgequake_latex2pdf::templates::MISSING_RESOURCE_HINT;
use edgequake_latex2pdf::{
    convert_batch, convert_file, ConversionConfig, InputItem, NodeParameters, ProcessCompiler,
    ResultItem,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

const HELLO: &str = "\\documentclass{article}\\begin{document}Hi\\end{document}";

/// Skip this test unless E2E_ENABLED is set *and* `$engine` is installed.
macro_rules! e2e_skip_unless_ready {
    ($engine:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let engine: &str = $engine;
        if latex_probe::find_on_path(engine).is_none() {
            println!("SKIP: {engine} not found on PATH");
            return;
        }
        init_tracing();
    }};
}

/// Route library logs to the test output (`RUST_LOG` controls the level).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn continuing() -> ConversionConfig {
    ConversionConfig::builder()
        .continue_on_fail(true)
        .compile_timeout_secs(120)
        .build()
        .unwrap()
}

async fn run(params: &NodeParameters) -> Vec<ResultItem> {
    convert_batch(&[InputItem::new()], params, &ProcessCompiler::new(), &continuing())
        .await
        .unwrap()
}

fn assert_pdf(bytes: &[u8], context: &str) {
    assert!(
        bytes.starts_with(b"%PDF-"),
        "[{context}] output does not start with %PDF-"
    );
    assert!(
        bytes.len() > 500,
        "[{context}] suspiciously small PDF: {} bytes",
        bytes.len()
    );
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pdflatex_hello_world() {
    e2e_skip_unless_ready!("pdflatex");

    let params = NodeParameters::new().with("latexContent", HELLO);
    let results = run(&params).await;

    assert!(results[0].is_success(), "{:?}", results[0].error());
    let pdf = decode_bytes(&results[0].binary["data"], "data").unwrap();
    assert_pdf(&pdf, "pdflatex");
}

#[tokio::test]
async fn test_two_passes_resolve_references() {
    e2e_skip_unless_ready!("pdflatex");

    let src = "\\documentclass{article}\\begin{document}\
               \\section{One}\\label{s}See Section~\\ref{s}.\\end{document}";
    let params = NodeParameters::new()
        .with("latexContent", src)
        .with("passes", 2);
    let results = run(&params).await;

    assert!(results[0].is_success(), "{:?}", results[0].error());
}

#[tokio::test]
async fn test_missing_package_gets_guidance() {
    e2e_skip_unless_ready!("pdflatex");

    let src = HELLO.replace(
        "\\begin{document}",
        "\\usepackage{surely-not-a-real-pkg}\\begin{document}",
    );
    let params = NodeParameters::new().with("latexContent", src);
    let results = run(&params).await;

    let error = results[0].error().expect("compilation should fail");
    assert!(error.contains("surely-not-a-real-pkg.sty"), "got: {error}");
    assert!(error.contains(MISSING_RESOURCE_HINT));
}

#[tokio::test]
async fn test_xelatex_with_fonts_dir() {
    e2e_skip_unless_ready!("xelatex");

    let fonts = tempfile::tempdir().unwrap();
    let params = NodeParameters::new()
        .with("latexContent", HELLO)
        .with("latexCmd", "xelatex")
        .with(
            "additionalOptions",
            serde_json::json!({ "option": [{ "fonts": fonts.path().to_string_lossy() }] }),
        );
    let results = run(&params).await;

    assert!(results[0].is_success(), "{:?}", results[0].error());
}

#[tokio::test]
async fn test_convert_file_writes_pdf() {
    e2e_skip_unless_ready!("pdflatex");

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("hello.tex");
    std::fs::write(&input, HELLO).unwrap();
    let output: PathBuf = dir.path().join("out").join("hello.pdf");

    let written = convert_file(
        &input,
        &output,
        &NodeParameters::new(),
        &ProcessCompiler::new(),
        &ConversionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(written, output);
    assert_pdf(&std::fs::read(&output).unwrap(), "convert_file");
}
