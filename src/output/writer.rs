// Artifact writer
//
// Writes rendered documents under the output directory. Existing files are
// overwritten; files from earlier runs that are no longer produced are left
// alone.

use crate::error::{Error, Result};
use crate::output::documents::RenderedDocument;
use log::debug;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| Error::output_dir(&self.output_dir, e))
    }

    /// Write one document, creating parent directories as needed
    pub fn write(&self, doc: &RenderedDocument) -> Result<PathBuf> {
        let path = self.output_dir.join(&doc.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::write(&path, e))?;
        }
        fs::write(&path, &doc.content).map_err(|e| Error::write(&path, e))?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Write every document in parallel; paths come back in input order
    pub fn write_all(&self, docs: &[RenderedDocument]) -> Result<Vec<PathBuf>> {
        self.prepare()?;
        docs.par_iter().map(|doc| self.write(doc)).collect()
    }
}
