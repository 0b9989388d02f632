//! Host backed by a real Excel instance running under WINE.

use std::path::{Path, PathBuf};

use tracker_forge_core::{CellError, CellValue};
use tracker_forge_excel::{self as excel, ExcelBridge, ExcelBridgeConfig, WorkbookHandle};

use crate::config::ExcelSettings;
use crate::host::{DocumentId, Host, HostError, HostLauncher, PasteLayer};
use crate::region::RangeAddress;

/// Starts a hidden Excel through the bridge for every session.
#[derive(Debug, Clone, Default)]
pub struct ExcelLauncher {
    config: ExcelBridgeConfig,
}

impl ExcelLauncher {
    pub fn new(config: ExcelBridgeConfig) -> Self {
        Self { config }
    }

    /// Build from the `[excel]` table of a configuration file.
    pub fn from_settings(settings: &ExcelSettings) -> Self {
        let mut config = ExcelBridgeConfig::default();
        config.bridge_exe_path = settings.bridge_exe.clone();
        if let Some(wine) = &settings.wine {
            config.wine_path = wine.clone();
        }
        config.wine_prefix = settings.wine_prefix.clone();
        Self { config }
    }
}

impl HostLauncher for ExcelLauncher {
    type Host = ExcelHost;

    fn launch(&self) -> Result<ExcelHost, HostError> {
        let bridge = ExcelBridge::start(self.config.clone())?;
        Ok(ExcelHost { bridge })
    }
}

/// One Excel session. Every capability maps to one bridge command, except
/// value reads and writes, which go cell by cell.
pub struct ExcelHost {
    bridge: ExcelBridge,
}

fn handle(doc: DocumentId) -> WorkbookHandle {
    WorkbookHandle(doc.get())
}

impl Host for ExcelHost {
    fn open(&mut self, path: &Path) -> Result<DocumentId, HostError> {
        let wb = self.bridge.open_workbook(path).map_err(|e| HostError::Open {
            path: PathBuf::from(path),
            reason: e.to_string(),
        })?;
        Ok(DocumentId::new(wb.0))
    }

    fn save(&mut self, doc: DocumentId) -> Result<(), HostError> {
        Ok(self.bridge.save_workbook(handle(doc))?)
    }

    fn close(&mut self, doc: DocumentId) -> Result<(), HostError> {
        Ok(self.bridge.close_workbook(handle(doc))?)
    }

    fn shutdown(&mut self) -> Result<(), HostError> {
        Ok(self.bridge.shutdown()?)
    }

    fn sheet_names(&mut self, doc: DocumentId) -> Result<Vec<String>, HostError> {
        Ok(self.bridge.list_sheets(handle(doc))?)
    }

    fn resolve_range(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<(), HostError> {
        Ok(self
            .bridge
            .check_range(handle(doc), sheet, &range.to_string())?)
    }

    fn read_values(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<Vec<Vec<CellValue>>, HostError> {
        let cells = range.cell_range();
        let mut rows = Vec::with_capacity(cells.row_count() as usize);
        for row in cells.start.row..=cells.end.row {
            let mut values = Vec::with_capacity(usize::from(cells.col_count()));
            for col in cells.start.col..=cells.end.col {
                let cell = tracker_forge_core::CellAddress::new(row, col).to_a1_string();
                let value = self.bridge.get_cell_value(handle(doc), sheet, &cell)?;
                values.push(from_wire(value));
            }
            rows.push(values);
        }
        Ok(rows)
    }

    fn write_values(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        rows: &[Vec<CellValue>],
    ) -> Result<(), HostError> {
        let cells = range.cell_range();
        let (height, width) = cells.dimensions();
        if rows.len() != height as usize || rows.iter().any(|r| r.len() != usize::from(width)) {
            return Err(HostError::PasteShape {
                copied: format!("{}x{}", rows.len(), rows.first().map_or(0, Vec::len)),
                target: range.to_string(),
            });
        }
        for (address, value) in cells.cells().zip(rows.iter().flatten()) {
            self.bridge.set_cell_value(
                handle(doc),
                sheet,
                &address.to_a1_string(),
                to_wire(value),
            )?;
        }
        Ok(())
    }

    fn copy_range(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<(), HostError> {
        Ok(self.bridge.copy_range(handle(doc), sheet, &range.to_string())?)
    }

    fn paste_special(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        layer: PasteLayer,
    ) -> Result<(), HostError> {
        let layer = match layer {
            PasteLayer::Values => excel::PasteLayer::Values,
            PasteLayer::Formats => excel::PasteLayer::Formats,
            PasteLayer::ConditionalFormats => excel::PasteLayer::ConditionalFormats,
        };
        Ok(self
            .bridge
            .paste_special(handle(doc), sheet, &range.to_string(), layer)?)
    }

    fn clear_transfer_buffer(&mut self) -> Result<(), HostError> {
        Ok(self.bridge.clear_clipboard()?)
    }

    fn conditional_format_count(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
    ) -> Result<usize, HostError> {
        Ok(self
            .bridge
            .count_format_conditions(handle(doc), sheet, &range.to_string())?)
    }

    fn delete_conditional_format(
        &mut self,
        doc: DocumentId,
        sheet: &str,
        range: &RangeAddress,
        index: usize,
    ) -> Result<(), HostError> {
        Ok(self
            .bridge
            .delete_format_condition(handle(doc), sheet, &range.to_string(), index)?)
    }

    fn append_sheet_copy(
        &mut self,
        source: DocumentId,
        sheet: &str,
        target: DocumentId,
    ) -> Result<String, HostError> {
        Ok(self
            .bridge
            .copy_sheet_to_end(handle(source), sheet, handle(target))?)
    }
}

fn from_wire(value: excel::CellValue) -> CellValue {
    match value {
        excel::CellValue::Null => CellValue::Empty,
        excel::CellValue::Bool(b) => CellValue::Boolean(b),
        excel::CellValue::Number(n) => CellValue::Number(n),
        excel::CellValue::String(s) => CellValue::String(s),
        excel::CellValue::Error(e) => CellError::parse(&e.code)
            .map(CellValue::Error)
            .unwrap_or(CellValue::String(e.code)),
    }
}

fn to_wire(value: &CellValue) -> excel::CellValue {
    match value.computed() {
        CellValue::Empty | CellValue::Formula { .. } => excel::CellValue::Null,
        CellValue::Boolean(b) => excel::CellValue::Bool(b),
        CellValue::Number(n) => excel::CellValue::Number(n),
        CellValue::String(s) => excel::CellValue::String(s),
        CellValue::Error(e) => excel::CellValue::Error(excel::CellError {
            code: e.as_str().to_string(),
        }),
    }
}
