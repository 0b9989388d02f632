//! Runs the assembler over every input document, one at a time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::assembler::{AssemblyError, AssemblyOutcome, DocumentAssembler};
use crate::config::AssemblyConfig;
use crate::host::HostLauncher;
use crate::region::{MergePlan, PlanError};

/// Failures that stop a batch before any document is processed
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("invalid merge plan: {0}")]
    Plan(#[from] PlanError),

    #[error("cannot list inputs in {path}: {source}")]
    Discovery { path: PathBuf, source: io::Error },

    #[error("cannot create output folder {path}: {source}")]
    OutputFolder { path: PathBuf, source: io::Error },
}

/// Produces the documents a batch should process.
pub trait InputSource {
    fn inputs(&self) -> Result<Vec<PathBuf>, BatchError>;
}

impl InputSource for Vec<PathBuf> {
    fn inputs(&self) -> Result<Vec<PathBuf>, BatchError> {
        Ok(self.clone())
    }
}

/// Regular files of one folder with a recognized extension.
///
/// Files are returned in directory-enumeration order, which is not stable.
#[derive(Debug, Clone)]
pub struct FolderSource {
    folder: PathBuf,
    extensions: Vec<String>,
}

impl FolderSource {
    pub fn new(folder: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            folder: folder.into(),
            extensions,
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| {
                self.extensions.iter().any(|want| want.eq_ignore_ascii_case(ext))
            })
    }
}

impl InputSource for FolderSource {
    fn inputs(&self) -> Result<Vec<PathBuf>, BatchError> {
        let discovery = |source| BatchError::Discovery {
            path: self.folder.clone(),
            source,
        };

        let mut found = Vec::new();
        for entry in fs::read_dir(&self.folder).map_err(discovery)? {
            let entry = entry.map_err(discovery)?;
            let path = entry.path();
            if entry.file_type().map_err(discovery)?.is_file() && self.accepts(&path) {
                found.push(path);
            }
        }
        Ok(found)
    }
}

/// Result for one input document.
#[derive(Debug)]
pub struct BatchItem {
    pub input: PathBuf,
    pub output_path: PathBuf,
    pub result: Result<AssemblyOutcome, AssemblyError>,
}

/// Per-document results of a batch, in processing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|i| i.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|i| i.result.is_err())
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Assembles one output per input; a failed document never stops the batch.
pub struct BatchRunner<L> {
    assembler: DocumentAssembler<L>,
    template_path: PathBuf,
    output_folder: PathBuf,
    plan: MergePlan,
}

impl<L: HostLauncher> BatchRunner<L> {
    pub fn new(
        template_path: impl Into<PathBuf>,
        output_folder: impl Into<PathBuf>,
        plan: MergePlan,
        launcher: L,
    ) -> Self {
        Self {
            assembler: DocumentAssembler::new(launcher),
            template_path: template_path.into(),
            output_folder: output_folder.into(),
            plan,
        }
    }

    pub fn from_config(config: &AssemblyConfig, launcher: L) -> Result<Self, BatchError> {
        Ok(Self::new(
            &config.template_path,
            &config.output_folder,
            config.plan()?,
            launcher,
        ))
    }

    pub fn plan(&self) -> &MergePlan {
        &self.plan
    }

    /// Process every input of `source`. Output names mirror input names.
    pub fn run(&self, source: &dyn InputSource) -> Result<BatchReport, BatchError> {
        fs::create_dir_all(&self.output_folder).map_err(|source| BatchError::OutputFolder {
            path: self.output_folder.clone(),
            source,
        })?;

        let mut report = BatchReport::default();
        for input in source.inputs()? {
            let Some(file_name) = input.file_name() else {
                tracing::warn!(input = %input.display(), "skipping input without a file name");
                continue;
            };
            let output_path = self.output_folder.join(file_name);

            tracing::info!(input = %input.display(), "processing");
            let result =
                self.assembler
                    .assemble(&input, &self.template_path, &output_path, &self.plan);
            match &result {
                Ok(outcome) => tracing::info!(
                    output = %outcome.output_path.display(),
                    degraded = outcome.degraded().count(),
                    appended = outcome.appended_sheets.len(),
                    "processed"
                ),
                Err(e) => tracing::error!(input = %input.display(), error = %e, "processing failed"),
            }

            report.items.push(BatchItem {
                input,
                output_path,
                result,
            });
        }
        Ok(report)
    }
}
