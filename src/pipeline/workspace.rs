//! Per-item scratch directory.
//!
//! One [`Workspace`] is created per item right before compilation and handed
//! to the compiler as its working directory. [`Workspace::cleanup`] removes it
//! whatever the compile outcome was; if removal fails the error is logged at
//! debug level and otherwise ignored. Dropping a `Workspace` without calling
//! `cleanup` also removes the directory.

use crate::error::ConversionError;
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

const PREFIX: &str = "latex2pdf-";

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh, uniquely named directory under the system temp dir.
    pub fn create() -> Result<Self, ConversionError> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir()
            .map_err(ConversionError::Workspace)?;
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory and everything in it. Never fails.
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            debug!("Ignoring workspace cleanup failure for {}: {}", path.display(), e);
        }
    }
}
