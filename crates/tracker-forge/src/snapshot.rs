//! In-memory host over `tracker-forge-core` workbooks.
//!
//! Documents are JSON snapshots of a [`Workbook`]; the file extension is not
//! interpreted. `open` loads the snapshot and `save` writes it back to the
//! path it was opened from.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracker_forge_core::{CellData, CellRange, CellValue, ConditionalFormatRule, Workbook, Worksheet};

use crate::host::{DocumentId, Host, HostError, HostLauncher, PasteLayer};
use crate::region::RangeAddress;

/// Read a workbook snapshot from disk.
pub fn load_snapshot(path: &Path) -> Result<Workbook, HostError> {
    let text = fs::read_to_string(path).map_err(|e| HostError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| HostError::Open {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write a workbook snapshot to disk.
pub fn save_snapshot(path: &Path, workbook: &Workbook) -> Result<(), HostError> {
    let json = serde_json::to_string_pretty(workbook)?;
    fs::write(path, json)?;
    Ok(())
}

/// Launches [`SnapshotHost`] sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotLauncher;

impl HostLauncher for SnapshotLauncher {
    type Host = SnapshotHost;

    fn launch(&self) -> Result<SnapshotHost, HostError> {
        Ok(SnapshotHost::new())
    }
}

struct OpenDocument {
    path: PathBuf,
    workbook: Workbook,
}

/// What the last `copy_range` captured.
struct Clipboard {
    origin: CellRange,
    cells: Vec<Vec<CellData>>,
    /// Source rules clipped to `origin`
    rules: Vec<ConditionalFormatRule>,
}

/// A host session backed by in-memory workbooks.
pub struct SnapshotHost {
    documents: HashMap<DocumentId, OpenDocument>,
    clipboard: Option<Clipboard>,
    next_id: u64,
    running: bool,
}

impl SnapshotHost {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            clipboard: None,
            next_id: 1,
            running: true,
        }
    }

    /// The in-memory state of an open document.
    pub fn workbook(&self, doc: DocumentId) -> Option<&Workbook> {
        self.documents.get(&doc).map(|d| &d.workbook)
    }

    /// Whether the transfer buffer currently holds a copied range.
    pub fn has_transfer_buffer(&self) -> bool {
        self.clipboard.is_some()
    }

    fn document(&self, doc: DocumentId) -> Result<&OpenDocument, HostError> {
        if !self.running {
            return Err(HostError::NotRunning);
        }
        self.documents
            .get(&doc)
            .ok_or(HostError::UnknownDocument(doc))
    }

    fn sheet(&self, doc: DocumentId, name: &str) -> Result<&Worksheet, HostError> {
        self.document(doc)?
            .workbook
            .worksheet_by_name(name)
            .ok_or_else(|| HostError::SheetNotFound(name.to_string()))
    }

    fn sheet_mut(&mut self, doc: DocumentId, name: &str) -> Result<&mut Worksheet, HostError> {
        if !self.running {
            return Err(HostError::NotRunning);
        }
        self.documents
            .get_mut(&doc)
            .ok_or(HostError::UnknownDocument(doc))?
            .workbook
            .worksheet_by_name_mut(name)
            .ok_or_else(|| HostError::SheetNotFound(name.to_string()))
    }
}

impl Default for SnapshotHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for SnapshotHost {
    fn open(&mut self, path: &Path) -> Result<DocumentId, HostError> {
        if !self.running {
            return Err(HostError::NotRunning);
        }
        let workbook = load_snapshot(path)?;
        let id = DocumentId::new(self.next_id);
        self.next_id += 1;
        tracing::debug!(doc = %id, path = %path.display(), "opened snapshot");
        self.documents.insert(
            id,
            OpenDocument {
                path: path.to_path_buf(),
                workbook,
            },
        );
        Ok(id)
    }

    fn save(&mut self, doc: DocumentId) -> Result<(), HostError> {
        let document = self.document(doc)?;
        save_snapshot(&document.path, &document.workbook)
    }

    fn close(&mut self, doc: DocumentId) -> Result<(), HostError> {
        self.document(doc)?;
        self.documents.remove(&doc);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), HostError> {
        self.documents.clear();
        self.clipboard = None;
        self.running = false;
        Ok(())
    }

    fn sheet_names(&mut self, doc: DocumentId) -> Result<Vec<String>, HostError> {
        Ok(self.document(doc)?.workbook.sheet_names())
    }

    fn resolve_range(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        _range: &RangeAddress,
    ) -> Result<(), HostError> {
        // A parsed address is always within sheet bounds
        self.sheet(doc, sheet).map(|_| ())
    }

    fn read_values(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<Vec<Vec<CellValue>>, HostError> {
        let rows = self.sheet(doc, sheet)?.range_values(&range.cell_range());
        Ok(rows
            .into_iter()
            .map(|row| row.iter().map(CellValue::computed).collect())
            .collect())
    }

    fn write_values(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        rows: &[Vec<CellValue>],
    ) -> Result<(), HostError> {
        self.sheet_mut(doc, sheet)?
            .write_values(&range.cell_range(), rows)?;
        Ok(())
    }

    fn copy_range(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<(), HostError> {
        let origin = range.cell_range();
        let ws = self.sheet(doc, sheet)?;
        let clipboard = Clipboard {
            origin,
            cells: ws.range_cells(&origin),
            rules: ws
                .conditional_formats_in(&origin)
                .into_iter()
                .filter_map(|rule| rule.clipped_to(&origin))
                .collect(),
        };
        self.clipboard = Some(clipboard);
        Ok(())
    }

    fn paste_special(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        layer: PasteLayer,
    ) -> Result<(), HostError> {
        let dest = range.cell_range();
        let clipboard = self.clipboard.take().ok_or(HostError::EmptyTransferBuffer)?;
        let result = paste(self.sheet_mut(doc, sheet), &clipboard, dest, layer);
        // Pasting leaves the buffer in place, as Excel does
        self.clipboard = Some(clipboard);
        result
    }

    fn clear_transfer_buffer(&mut self) -> Result<(), HostError> {
        self.clipboard = None;
        Ok(())
    }

    fn conditional_format_count(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<usize, HostError> {
        Ok(self
            .sheet(doc, sheet)?
            .conditional_formats_in(&range.cell_range())
            .len())
    }

    fn delete_conditional_format(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        index: usize,
    ) -> Result<(), HostError> {
        if self
            .sheet_mut(doc, sheet)?
            .detach_conditional_format(&range.cell_range(), index)
        {
            Ok(())
        } else {
            Err(HostError::NoSuchRule {
                sheet: sheet.to_string(),
                range: range.to_string(),
                index,
            })
        }
    }

    fn append_sheet_copy(
        &mut self,
        source: DocumentId,
        sheet: &str,
        target: DocumentId,
    ) -> Result<String, HostError> {
        let copy = self.sheet(source, sheet)?.clone();
        let document = self
            .documents
            .get_mut(&target)
            .ok_or(HostError::UnknownDocument(target))?;
        Ok(document.workbook.push_worksheet_copy(copy)?)
    }
}

fn paste(
    ws: Result<&mut Worksheet, HostError>,
    clipboard: &Clipboard,
    dest: CellRange,
    layer: PasteLayer,
) -> Result<(), HostError> {
    let ws = ws?;
    if clipboard.origin.dimensions() != dest.dimensions() {
        return Err(HostError::PasteShape {
            copied: clipboard.origin.to_string(),
            target: dest.to_string(),
        });
    }

    match layer {
        PasteLayer::Values => {
            let rows: Vec<Vec<CellValue>> = clipboard
                .cells
                .iter()
                .map(|row| row.iter().map(|c| c.value.computed()).collect())
                .collect();
            ws.write_values(&dest, &rows)?;
        }
        PasteLayer::Formats => {
            let rows: Vec<Vec<_>> = clipboard
                .cells
                .iter()
                .map(|row| row.iter().map(|c| c.style.clone()).collect())
                .collect();
            ws.write_styles(&dest, &rows)?;
        }
        PasteLayer::ConditionalFormats => {
            let row_delta = i64::from(dest.start.row) - i64::from(clipboard.origin.start.row);
            let col_delta = i64::from(dest.start.col) - i64::from(clipboard.origin.start.col);
            for rule in &clipboard.rules {
                if let Some(moved) = rule.translated(row_delta, col_delta) {
                    let priority = ws.next_conditional_priority();
                    ws.add_conditional_format(moved.with_priority(priority));
                }
            }
        }
    }
    Ok(())
}
