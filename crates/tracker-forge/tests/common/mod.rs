//! Shared fixtures: workbook snapshots on disk and a host that fails on demand.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracker_forge::model::{CellRange, ConditionalFormatRule, Style, Workbook, Worksheet};
use tracker_forge::{
    load_snapshot, save_snapshot, DocumentId, Host, HostError, HostLauncher, PasteLayer,
    RangeAddress, SnapshotHost,
};

pub fn range(s: &str) -> RangeAddress {
    RangeAddress::parse(s).unwrap()
}

pub fn cells(s: &str) -> CellRange {
    CellRange::parse(s).unwrap()
}

pub fn write_workbook(path: &Path, sheets: Vec<Worksheet>) -> PathBuf {
    let mut wb = Workbook::empty();
    for ws in sheets {
        wb.push_worksheet(ws).unwrap();
    }
    save_snapshot(path, &wb).unwrap();
    path.to_path_buf()
}

pub fn read_workbook(path: &Path) -> Workbook {
    load_snapshot(path).unwrap()
}

/// A "Tracker" sheet as an entity fills it in.
pub fn filled_tracker(owner: &str) -> Worksheet {
    let mut ws = Worksheet::new("Tracker");
    ws.set_cell_value("A2", owner).unwrap();
    ws.set_cell_value("B2", 12.5).unwrap();
    ws.set_cell_value("C2", true).unwrap();
    ws.set_cell_value("A3", "Follow-up").unwrap();
    ws.set_cell_style("A2", &Style::new().bold(true)).unwrap();
    ws.add_conditional_format(
        ConditionalFormatRule::cell_is_greater_than("10").with_range(cells("B2:B100")),
    );
    ws
}

/// The template's empty "Tracker" sheet, with its own styling and a rule.
pub fn template_tracker() -> Worksheet {
    let mut ws = Worksheet::new("Tracker");
    ws.set_cell_value("A1", "Owner").unwrap();
    ws.set_cell_style("A1", &Style::new().italic(true)).unwrap();
    ws.set_cell_style("B2", &Style::new().number_format("0.00")).unwrap();
    ws.add_conditional_format(ConditionalFormatRule::contains_text("late").with_range(cells("A2:H100")));
    ws
}

pub fn totals(value: f64) -> Worksheet {
    let mut ws = Worksheet::new("Totals");
    ws.set_cell_value("B1", value).unwrap();
    ws
}

/// Host operations a test can make fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault {
    Open(String),
    Resolve(String),
    Read(String),
    Paste(String, PasteLayer),
    Delete(String),
    ClearBuffer,
    AppendSheet,
    Save,
    Shutdown,
}

/// Calls observed by a [`FaultyHost`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(PathBuf),
    Copy(String),
    Paste(String, PasteLayer),
    ClearBuffer,
    Delete(String, usize),
    Save,
    Close,
    Shutdown,
}

#[derive(Clone, Default)]
pub struct FaultyLauncher {
    pub faults: Vec<Fault>,
    pub calls: Rc<RefCell<Vec<Call>>>,
}

impl FaultyLauncher {
    pub fn failing(faults: Vec<Fault>) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl HostLauncher for FaultyLauncher {
    type Host = FaultyHost;

    fn launch(&self) -> Result<FaultyHost, HostError> {
        Ok(FaultyHost {
            inner: SnapshotHost::new(),
            faults: self.faults.clone(),
            calls: Rc::clone(&self.calls),
        })
    }
}

/// A [`SnapshotHost`] that fails the configured operations.
pub struct FaultyHost {
    pub inner: SnapshotHost,
    faults: Vec<Fault>,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl FaultyHost {
    pub fn new(faults: Vec<Fault>) -> Self {
        FaultyLauncher::failing(faults).launch().unwrap()
    }

    fn fail_if(&self, fault: Fault) -> Result<(), HostError> {
        if self.faults.contains(&fault) {
            Err(HostError::Backend(format!("injected {fault:?}")))
        } else {
            Ok(())
        }
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Host for FaultyHost {
    fn open(&mut self, path: &Path) -> Result<DocumentId, HostError> {
        self.record(Call::Open(path.to_path_buf()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.fail_if(Fault::Open(name))?;
        self.inner.open(path)
    }

    fn save(&mut self, doc: DocumentId) -> Result<(), HostError> {
        self.record(Call::Save);
        self.fail_if(Fault::Save)?;
        self.inner.save(doc)
    }

    fn close(&mut self, doc: DocumentId) -> Result<(), HostError> {
        self.record(Call::Close);
        self.inner.close(doc)
    }

    fn shutdown(&mut self) -> Result<(), HostError> {
        self.record(Call::Shutdown);
        self.inner.shutdown()?;
        self.fail_if(Fault::Shutdown)
    }

    fn sheet_names(&mut self, doc: DocumentId) -> Result<Vec<String>, HostError> {
        self.inner.sheet_names(doc)
    }

    fn resolve_range(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<(), HostError> {
        self.fail_if(Fault::Resolve(sheet.to_string()))?;
        self.inner.resolve_range(doc, sheet, range)
    }

    fn read_values(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<Vec<Vec<tracker_forge::model::CellValue>>, HostError> {
        self.fail_if(Fault::Read(sheet.to_string()))?;
        self.inner.read_values(doc, sheet, range)
    }

    fn write_values(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        rows: &[Vec<tracker_forge::model::CellValue>],
    ) -> Result<(), HostError> {
        self.inner.write_values(doc, sheet, range, rows)
    }

    fn copy_range(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<(), HostError> {
        self.record(Call::Copy(format!("{sheet}!{range}")));
        self.inner.copy_range(doc, sheet, range)
    }

    fn paste_special(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        layer: PasteLayer,
    ) -> Result<(), HostError> {
        self.record(Call::Paste(format!("{sheet}!{range}"), layer));
        self.fail_if(Fault::Paste(sheet.to_string(), layer))?;
        self.inner.paste_special(doc, sheet, range, layer)
    }

    fn clear_transfer_buffer(&mut self) -> Result<(), HostError> {
        self.record(Call::ClearBuffer);
        self.inner.clear_transfer_buffer()?;
        self.fail_if(Fault::ClearBuffer)
    }

    fn conditional_format_count(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<usize, HostError> {
        self.inner.conditional_format_count(doc, sheet, range)
    }

    fn delete_conditional_format(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        index: usize,
    ) -> Result<(), HostError> {
        self.record(Call::Delete(format!("{sheet}!{range}"), index));
        self.fail_if(Fault::Delete(sheet.to_string()))?;
        self.inner.delete_conditional_format(doc, sheet, range, index)
    }

    fn append_sheet_copy(
        &mut self,
        source: DocumentId,
        sheet: &str,
        target: DocumentId,
    ) -> Result<String, HostError> {
        self.fail_if(Fault::AppendSheet)?;
        self.inner.append_sheet_copy(source, sheet, target)
    }
}
