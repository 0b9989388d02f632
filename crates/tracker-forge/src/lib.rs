//! # tracker-forge
//!
//! Assembles per-entity report workbooks from a shared template.
//!
//! For every input workbook the engine clones the template, copies a fixed
//! list of regions from the input into the clone (values always; formatting
//! and conditional formatting per region), appends any sheets the template
//! lacks, and publishes the result under the input's name.
//!
//! The spreadsheet application is reached through the [`Host`] trait. Two
//! hosts ship with the crate:
//! - [`SnapshotHost`] - an in-memory model over JSON workbook snapshots
//! - `ExcelHost` - a hidden Excel under WINE (feature `excel`, on by default)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! use tracker_forge::{BatchRunner, MergePlan, RegionSpec, SnapshotLauncher};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let plan = MergePlan::new(vec![
//!         RegionSpec::new("Tracker", "A2:H100")?,
//!         RegionSpec::new("Totals", "B1")?.data_only(),
//!     ])?;
//!
//!     let runner = BatchRunner::new("template.xlsx", "out", plan, SnapshotLauncher);
//!     let inputs: Vec<PathBuf> = vec!["data/acme.xlsx".into(), "data/globex.xlsx".into()];
//!     let report = runner.run(&inputs)?;
//!     println!("{} failed", report.failed().count());
//!     Ok(())
//! }
//! ```

pub mod assembler;
pub mod batch;
pub mod config;
#[cfg(feature = "excel")]
pub mod excel;
pub mod host;
pub mod merger;
pub mod reconciler;
pub mod region;
pub mod snapshot;

pub use assembler::{AssemblyError, AssemblyOutcome, DocumentAssembler};
pub use batch::{BatchError, BatchItem, BatchReport, BatchRunner, FolderSource, InputSource};
pub use config::{AssemblyConfig, ConfigError, ExcelSettings, RegionConfig};
#[cfg(feature = "excel")]
pub use excel::{ExcelHost, ExcelLauncher};
pub use host::{DocumentId, Host, HostError, HostLauncher, PasteLayer, Session, TransferScope};
pub use merger::{MergeOutcome, RegionError, RegionMerger, Side};
pub use reconciler::SheetReconciler;
pub use region::{MergePlan, PlanError, RangeAddress, RegionSpec};
pub use snapshot::{load_snapshot, save_snapshot, SnapshotHost, SnapshotLauncher};

pub use tracker_forge_core as model;
