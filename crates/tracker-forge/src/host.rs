//! The capability interface the merge engine drives.
//!
//! A [`Host`] is a stateful spreadsheet application session: it opens
//! documents, reads and writes cell values, copies ranges into a shared
//! transfer buffer and pastes them back one layer at a time, and manages
//! conditional-format rules attached to a range. The engine never touches
//! document files directly except to clone the template and to publish.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tracker_forge_core::CellValue;

use crate::region::RangeAddress;

/// Identity of a document opened in a host session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One independently transferable layer of a copied range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasteLayer {
    /// Cell values as displayed (formula results, not formula text)
    Values,
    /// Fonts, fills, borders and number formats
    Formats,
    /// Conditional-formatting rules
    ConditionalFormats,
}

impl fmt::Display for PasteLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PasteLayer::Values => "values",
            PasteLayer::Formats => "formatting",
            PasteLayer::ConditionalFormats => "conditional formatting",
        })
    }
}

/// Errors reported by a host session
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("host session is not running")]
    NotRunning,

    #[error("cannot open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("unknown document {0}")]
    UnknownDocument(DocumentId),

    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("transfer buffer is empty")]
    EmptyTransferBuffer,

    #[error("cannot paste {copied} copied cells onto {target}")]
    PasteShape { copied: String, target: String },

    #[error("no conditional format #{index} on {sheet}!{range}")]
    NoSuchRule {
        sheet: String,
        range: String,
        index: usize,
    },

    #[error(transparent)]
    Model(#[from] tracker_forge_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[cfg(feature = "excel")]
    #[error(transparent)]
    Bridge(#[from] tracker_forge_excel::BridgeError),

    #[error("{0}")]
    Backend(String),
}

/// A running spreadsheet application session.
///
/// All calls block until the host has finished. Sheet names are matched
/// exactly (case-sensitive). Ranges address the same cells on every sheet.
pub trait Host {
    /// Open an existing document.
    fn open(&mut self, path: &Path) -> Result<DocumentId, HostError>;

    /// Save a document in place.
    fn save(&mut self, doc: DocumentId) -> Result<(), HostError>;

    /// Close a document without saving.
    fn close(&mut self, doc: DocumentId) -> Result<(), HostError>;

    /// End the session. Open documents are discarded.
    fn shutdown(&mut self) -> Result<(), HostError>;

    /// Worksheet names in workbook order.
    fn sheet_names(&mut self, doc: DocumentId) -> Result<Vec<String>, HostError>;

    /// Check that `range` can be addressed on `sheet`.
    fn resolve_range(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<(), HostError>;

    /// Displayed values of a range, row by row.
    fn read_values(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<Vec<Vec<CellValue>>, HostError>;

    /// Overwrite the values of a range, keeping its formatting.
    fn write_values(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        rows: &[Vec<CellValue>],
    ) -> Result<(), HostError>;

    /// Fill the transfer buffer with a range.
    fn copy_range(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<(), HostError>;

    /// Paste one layer of the transfer buffer onto a range.
    fn paste_special(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        layer: PasteLayer,
    ) -> Result<(), HostError>;

    /// Empty the transfer buffer.
    fn clear_transfer_buffer(&mut self) -> Result<(), HostError>;

    /// Number of conditional-format rules attached to a range.
    fn conditional_format_count(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<usize, HostError>;

    /// Delete the `index`-th (0-based) rule attached to a range.
    fn delete_conditional_format(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        index: usize,
    ) -> Result<(), HostError>;

    /// Append a full copy of `sheet` from `source` after the last sheet of `target`.
    ///
    /// Returns the name the copy received. It differs from `sheet` when the
    /// target already holds that name in another letter case, in which case the
    /// copy is renamed to `sheet (n)` the way Excel does.
    fn append_sheet_copy(
        &mut self,
        source: DocumentId,
        sheet: &str,
        target: DocumentId,
    ) -> Result<String, HostError>;
}

/// Starts isolated, non-interactive host sessions.
pub trait HostLauncher {
    type Host: Host;

    fn launch(&self) -> Result<Self::Host, HostError>;
}

/// A host session that is shut down on every exit path.
///
/// [`Session::finish`] shuts down and reports the result. A session dropped
/// without `finish` (early return, failed step) shuts down best-effort and
/// logs any failure.
pub struct Session<H: Host> {
    host: H,
    finished: bool,
}

impl<H: Host> Session<H> {
    /// Launch a new session.
    pub fn start<L: HostLauncher<Host = H>>(launcher: &L) -> Result<Self, HostError> {
        let host = launcher.launch()?;
        tracing::debug!("host session started");
        Ok(Self {
            host,
            finished: false,
        })
    }

    /// Shut the session down, surfacing any failure.
    pub fn finish(mut self) -> Result<(), HostError> {
        self.finished = true;
        let result = self.host.shutdown();
        tracing::debug!(ok = result.is_ok(), "host session finished");
        result
    }
}

impl<H: Host> Deref for Session<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.host
    }
}

impl<H: Host> DerefMut for Session<H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<H: Host> Drop for Session<H> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.host.shutdown() {
            tracing::warn!(error = %e, "failed to shut down host session");
        }
    }
}

/// Borrow of a host whose transfer buffer is emptied when the borrow ends.
///
/// Clearing failures are logged, never raised.
pub struct TransferScope<'h, H: Host + ?Sized> {
    host: &'h mut H,
}

impl<'h, H: Host + ?Sized> TransferScope<'h, H> {
    pub fn new(host: &'h mut H) -> Self {
        Self { host }
    }
}

impl<H: Host + ?Sized> Deref for TransferScope<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: Host + ?Sized> DerefMut for TransferScope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: Host + ?Sized> Drop for TransferScope<'_, H> {
    fn drop(&mut self) {
        if let Err(e) = self.host.clear_transfer_buffer() {
            tracing::warn!(error = %e, "failed to clear transfer buffer");
        }
    }
}
