//! # latex-probe
//!
//! Check that a TeX distribution is reachable before anything tries to shell
//! out to it. The probe walks `PATH` looking for the usual engines and, when
//! none is found, produces installation guidance for the current platform.
//!
//! ## How it works
//!
//! 1. Each entry of [`LATEX_ENGINES`] is looked up on `PATH` (with the
//!    `PATHEXT`-style `.exe` suffix on Windows).
//! 2. If at least one engine resolves, [`check_installation`] returns a
//!    [`ProbeReport`] listing every engine and where it was found.
//! 3. Otherwise it fails with [`ProbeError::NoEngineFound`], whose message
//!    carries [`install_instructions`] for the running OS.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use latex_probe::check_installation;
//!
//! match check_installation() {
//!     Ok(report) => println!("{}", report),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```
//!
//! ## Environment variable overrides
//!
//! - `SKIP_LATEX_CHECK=true`: report success without probing. Useful for
//!   container builds where the toolchain is mounted at runtime only.
//!
//! The probe is advisory. The conversion pipeline never calls
//! [`check_installation`]; it only reuses [`install_instructions`] when an
//! engine binary cannot be spawned.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Engines looked up by [`probe_engines`], in report order.
pub const LATEX_ENGINES: [&str; 4] = ["pdflatex", "xelatex", "lualatex", "latex"];

/// Environment variable that bypasses the probe when set to `true`.
pub const SKIP_ENV_VAR: &str = "SKIP_LATEX_CHECK";

const FALLBACK_URL: &str = "https://www.latex-project.org/get/";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by [`check_installation`].
#[derive(Error, Debug)]
pub enum ProbeError {
    /// None of [`LATEX_ENGINES`] could be found on `PATH`.
    #[error(
        "LaTeX is not installed or not found in PATH\n\n{instructions}\n\
To skip this check, set environment variable: SKIP_LATEX_CHECK=true"
    )]
    NoEngineFound { instructions: String },
}

// ── Report types ─────────────────────────────────────────────────────────────

/// Where (if anywhere) a single engine was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub name: &'static str,
    pub path: Option<PathBuf>,
}

impl EngineStatus {
    pub fn is_found(&self) -> bool {
        self.path.is_some()
    }
}

/// Result of a successful [`check_installation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Per-engine status. Empty when the probe was skipped.
    pub engines: Vec<EngineStatus>,
    /// `true` when `SKIP_LATEX_CHECK=true` short-circuited the probe.
    pub skipped: bool,
}

impl ProbeReport {
    /// Names of the engines that resolved on `PATH`.
    pub fn available(&self) -> Vec<&'static str> {
        self.engines
            .iter()
            .filter(|e| e.is_found())
            .map(|e| e.name)
            .collect()
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped {
            writeln!(f, "Skipping LaTeX check due to {SKIP_ENV_VAR} environment variable")?;
            return write!(f, "Make sure LaTeX is available at runtime!");
        }
        writeln!(f, "Checking for LaTeX engines:")?;
        for engine in &self.engines {
            match &engine.path {
                Some(p) => writeln!(f, "  ✓ {:<9} {}", engine.name, p.display())?,
                None => writeln!(f, "  ✗ {:<9} not found", engine.name)?,
            }
        }
        write!(f, "LaTeX installation verified.")
    }
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Probe `PATH` for every engine in [`LATEX_ENGINES`].
pub fn probe_engines() -> Vec<EngineStatus> {
    let dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default();

    LATEX_ENGINES
        .into_iter()
        .map(|name| EngineStatus {
            name,
            path: find_in_dirs(name, &dirs),
        })
        .collect()
}

/// Locate a single command on `PATH`.
pub fn find_on_path(command: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
    find_in_dirs(command, &dirs)
}

/// Locate `command` in the given directories, first match wins.
pub fn find_in_dirs(command: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| candidate_names(command).map(move |n| dir.join(n)))
        .find(|p| is_executable(p))
}

/// Platform-specific installation guidance for `os`
/// (a value of [`std::env::consts::OS`]).
pub fn install_instructions(os: &str) -> String {
    let body = match os {
        "macos" => {
            "macOS:\n\
  • Download MacTeX from: https://www.tug.org/mactex/\n\
  • Or install via Homebrew: brew install --cask mactex-no-gui"
                .to_string()
        }
        "linux" => {
            "Linux:\n\
  • Ubuntu/Debian: sudo apt-get install texlive-full\n\
  • CentOS/RHEL: sudo yum install texlive-scheme-full\n\
  • Arch Linux: sudo pacman -S texlive-most"
                .to_string()
        }
        "windows" => {
            "Windows:\n\
  • Download MiKTeX from: https://miktex.org/download\n\
  • Or download TeX Live from: https://www.tug.org/texlive/"
                .to_string()
        }
        _ => format!("  • Visit {FALLBACK_URL} for installation instructions"),
    };

    format!(
        "LaTeX Installation Instructions:\n\n\
A TeX distribution must be installed to compile documents:\n\n\
{body}\n\n\
After installation, restart your terminal and try again."
    )
}

/// Verify that at least one engine is installed.
///
/// Honours `SKIP_LATEX_CHECK=true`.
pub fn check_installation() -> Result<ProbeReport, ProbeError> {
    let skip = std::env::var(SKIP_ENV_VAR).map(|v| v == "true").unwrap_or(false);
    evaluate(skip, probe_engines())
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn evaluate(skip: bool, engines: Vec<EngineStatus>) -> Result<ProbeReport, ProbeError> {
    if engines.iter().any(EngineStatus::is_found) {
        return Ok(ProbeReport {
            engines,
            skipped: false,
        });
    }

    if skip {
        return Ok(ProbeReport {
            engines: Vec::new(),
            skipped: true,
        });
    }

    Err(ProbeError::NoEngineFound {
        instructions: install_instructions(std::env::consts::OS),
    })
}

fn candidate_names(command: &str) -> impl Iterator<Item = String> + '_ {
    let exe = if cfg!(windows) && !command.ends_with(".exe") {
        Some(format!("{command}.exe"))
    } else {
        None
    };
    std::iter::once(command.to_string()).chain(exe)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
