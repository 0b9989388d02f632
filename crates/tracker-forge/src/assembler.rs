//! Builds one output workbook: clone the template, merge regions, append
//! extra sheets, save, then publish under the final name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::host::{DocumentId, Host, HostError, HostLauncher, Session};
use crate::merger::{MergeOutcome, RegionMerger};
use crate::reconciler::SheetReconciler;
use crate::region::{MergePlan, RegionSpec};

/// Document-level failures. Each aborts that document only.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("cannot clone template {template} to {temp_path}: {source}")]
    Clone {
        template: PathBuf,
        temp_path: PathBuf,
        source: io::Error,
    },

    #[error("host session failed: {0}")]
    Session(#[source] HostError),

    #[error("cannot open {path}: {source}")]
    Open { path: PathBuf, source: HostError },

    #[error("cannot append extra sheets: {0}")]
    Reconcile(#[source] HostError),

    #[error("cannot save {path}: {source}")]
    Save { path: PathBuf, source: HostError },

    #[error("cannot close {path}: {source}")]
    Close { path: PathBuf, source: HostError },

    #[error("cannot publish {output_path}; processed file remains as {temp_path}: {source}")]
    Publish {
        temp_path: PathBuf,
        output_path: PathBuf,
        source: io::Error,
    },
}

impl AssemblyError {
    /// Where the finished work was left when publishing failed.
    pub fn temp_path(&self) -> Option<&Path> {
        match self {
            AssemblyError::Publish { temp_path, .. } => Some(temp_path),
            _ => None,
        }
    }
}

type RegionOutcomes = Vec<(RegionSpec, MergeOutcome)>;

/// What a successful assembly produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyOutcome {
    pub output_path: PathBuf,
    /// One entry per plan region, in plan order
    pub regions: Vec<(RegionSpec, MergeOutcome)>,
    /// Sheets copied whole from the source, in source order
    pub appended_sheets: Vec<String>,
}

impl AssemblyOutcome {
    /// Regions that did not fully merge.
    pub fn degraded(&self) -> impl Iterator<Item = &(RegionSpec, MergeOutcome)> {
        self.regions.iter().filter(|(_, outcome)| !outcome.is_merged())
    }
}

/// Assembles documents in sessions started by a [`HostLauncher`].
pub struct DocumentAssembler<L> {
    launcher: L,
}

impl<L: HostLauncher> DocumentAssembler<L> {
    pub fn new(launcher: L) -> Self {
        Self { launcher }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Assemble `output_path` from `template_path` and the data in `source_path`.
    ///
    /// Nothing is written to `output_path` unless every step before publishing
    /// succeeded. When a later step fails the temporary clone is left where it
    /// is and never deleted.
    pub fn assemble(
        &self,
        source_path: &Path,
        template_path: &Path,
        output_path: &Path,
        plan: &MergePlan,
    ) -> Result<AssemblyOutcome, AssemblyError> {
        let temp_path = temp_clone_path(template_path, output_path);
        fs::copy(template_path, &temp_path).map_err(|source| AssemblyError::Clone {
            template: template_path.to_path_buf(),
            temp_path: temp_path.clone(),
            source,
        })?;
        tracing::debug!(temp = %temp_path.display(), "cloned template");

        let (regions, appended_sheets) = self.populate(source_path, &temp_path, plan)?;
        publish(&temp_path, output_path)?;

        Ok(AssemblyOutcome {
            output_path: output_path.to_path_buf(),
            regions,
            appended_sheets,
        })
    }

    /// Run every host step against the clone inside one session.
    fn populate(
        &self,
        source_path: &Path,
        temp_path: &Path,
        plan: &MergePlan,
    ) -> Result<(RegionOutcomes, Vec<String>), AssemblyError> {
        let mut session = Session::start(&self.launcher).map_err(AssemblyError::Session)?;
        let host = &mut *session;

        let source = open(host, source_path)?;
        let target = open(host, temp_path)?;

        let regions: RegionOutcomes = plan
            .iter()
            .map(|spec| (spec.clone(), merge_region(&mut *host, source, target, spec)))
            .collect();

        let appended =
            SheetReconciler::reconcile(host, source, target).map_err(AssemblyError::Reconcile)?;

        host.save(target).map_err(|source| AssemblyError::Save {
            path: temp_path.to_path_buf(),
            source,
        })?;
        for (doc, path) in [(target, temp_path), (source, source_path)] {
            host.close(doc).map_err(|source| AssemblyError::Close {
                path: path.to_path_buf(),
                source,
            })?;
        }

        session.finish().map_err(AssemblyError::Session)?;
        Ok((regions, appended))
    }
}

fn open<H: Host + ?Sized>(host: &mut H, path: &Path) -> Result<DocumentId, AssemblyError> {
    host.open(path).map_err(|source| AssemblyError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_region<H: Host + ?Sized>(
    host: &mut H,
    source: DocumentId,
    target: DocumentId,
    spec: &RegionSpec,
) -> MergeOutcome {
    let has_sheet = |host: &mut H, doc| -> Result<bool, HostError> {
        Ok(host.sheet_names(doc)?.iter().any(|s| *s == spec.sheet_name))
    };

    match has_sheet(host, source) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(sheet = %spec.sheet_name, "sheet not found in source file");
            return MergeOutcome::SheetMissingInSource;
        }
        Err(e) => return MergeOutcome::PartialFailure(e.to_string()),
    }
    match has_sheet(host, target) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(sheet = %spec.sheet_name, "sheet not found in template file");
            return MergeOutcome::SheetMissingInTarget;
        }
        Err(e) => return MergeOutcome::PartialFailure(e.to_string()),
    }

    tracing::info!(region = %spec, "copying range");
    RegionMerger::merge(host, source, target, spec)
}

/// `temp_<random>.<template extension>` next to the output.
fn temp_clone_path(template_path: &Path, output_path: &Path) -> PathBuf {
    let extension = template_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("xlsx");
    let name = format!("temp_{}.{extension}", uuid::Uuid::new_v4().simple());
    match output_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => PathBuf::from(name),
    }
}

/// Replace whatever is at `output_path` with the finished clone.
fn publish(temp_path: &Path, output_path: &Path) -> Result<(), AssemblyError> {
    let replace = || -> io::Result<()> {
        if output_path.exists() {
            fs::remove_file(output_path)?;
        }
        fs::rename(temp_path, output_path)
    };

    replace().map_err(|source| {
        tracing::error!(
            temp = %temp_path.display(),
            error = %source,
            "processed file remains under its temporary name"
        );
        AssemblyError::Publish {
            temp_path: temp_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            source,
        }
    })
}
