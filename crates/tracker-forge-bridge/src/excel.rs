//! Workbook, range, clipboard and conditional-format operations on a hidden Excel.

#![cfg(windows)]

use std::collections::HashMap;

use tracker_forge_protocol::{CellValue, PasteLayer};

use crate::dispatch::{self, DispatchObject};
use crate::values::{self, Scalar};

/// A running Excel.Application plus the workbooks opened through it.
pub struct ExcelApp {
    app: DispatchObject,
    workbooks: HashMap<u64, DispatchObject>,
    next_handle: u64,
}

impl ExcelApp {
    pub fn new() -> Result<Self, String> {
        let app = DispatchObject::create("Excel.Application")?;
        for prop in ["Visible", "DisplayAlerts", "ScreenUpdating"] {
            app.put(prop, dispatch::from_bool(false))?;
        }
        Ok(Self {
            app,
            workbooks: HashMap::new(),
            next_handle: 1,
        })
    }

    pub fn open_workbook(&mut self, path: &str) -> Result<u64, String> {
        let wb = self
            .app
            .object("Workbooks", &[])?
            .call("Open", &[dispatch::from_str(path)])?;
        let wb = as_workbook(&wb)?;
        let handle = self.next_handle;
        self.next_handle += 1;
        self.workbooks.insert(handle, wb);
        eprintln!("[tracker-forge-bridge] opened workbook {handle}: {path}");
        Ok(handle)
    }

    fn workbook(&self, handle: u64) -> Result<&DispatchObject, String> {
        self.workbooks
            .get(&handle)
            .ok_or_else(|| format!("Unknown workbook handle: {handle}"))
    }

    fn sheet(&self, handle: u64, name: &str) -> Result<DispatchObject, String> {
        self.workbook(handle)?
            .object("Worksheets", &[])?
            .object("Item", &[dispatch::from_str(name)])
    }

    fn range(&self, handle: u64, sheet: &str, range: &str) -> Result<DispatchObject, String> {
        self.sheet(handle, sheet)?
            .object("Range", &[dispatch::from_str(range)])
    }

    pub fn list_sheets(&self, handle: u64) -> Result<Vec<String>, String> {
        let sheets = self.workbook(handle)?.object("Worksheets", &[])?;
        let count = sheets.count()?;
        (1..=count)
            .map(|i| {
                let ws = sheets.object("Item", &[dispatch::from_i32(i)])?;
                match dispatch::to_scalar(&ws.get("Name", &[])?) {
                    Scalar::Text(name) => Ok(name),
                    _ => Err(format!("Worksheet {i} has no name")),
                }
            })
            .collect()
    }

    pub fn check_range(&self, handle: u64, sheet: &str, range: &str) -> Result<(), String> {
        self.range(handle, sheet, range).map(|_| ())
    }

    pub fn get_cell_value(&self, handle: u64, sheet: &str, cell: &str) -> Result<CellValue, String> {
        let value = self.range(handle, sheet, cell)?.get("Value2", &[])?;
        Ok(values::to_cell_value(dispatch::to_scalar(&value)))
    }

    pub fn set_cell_value(
        &self,
        handle: u64,
        sheet: &str,
        cell: &str,
        value: &CellValue,
    ) -> Result<(), String> {
        let variant = dispatch::from_value2(values::to_value2(value));
        self.range(handle, sheet, cell)?.put("Value2", variant)
    }

    pub fn copy_range(&self, handle: u64, sheet: &str, range: &str) -> Result<(), String> {
        self.range(handle, sheet, range)?.call("Copy", &[])?;
        Ok(())
    }

    pub fn paste_special(
        &self,
        handle: u64,
        sheet: &str,
        range: &str,
        layer: PasteLayer,
    ) -> Result<(), String> {
        self.range(handle, sheet, range)?
            .call("PasteSpecial", &[dispatch::from_i32(layer.xl_paste_type())])?;
        Ok(())
    }

    pub fn clear_clipboard(&self) -> Result<(), String> {
        self.app.put("CutCopyMode", dispatch::from_bool(false))
    }

    pub fn count_format_conditions(
        &self,
        handle: u64,
        sheet: &str,
        range: &str,
    ) -> Result<u32, String> {
        let count = self
            .range(handle, sheet, range)?
            .object("FormatConditions", &[])?
            .count()?;
        Ok(count.max(0) as u32)
    }

    pub fn delete_format_condition(
        &self,
        handle: u64,
        sheet: &str,
        range: &str,
        index: u32,
    ) -> Result<(), String> {
        // FormatConditions is 1-based
        let item = i32::try_from(index + 1).map_err(|e| e.to_string())?;
        self.range(handle, sheet, range)?
            .object("FormatConditions", &[])?
            .object("Item", &[dispatch::from_i32(item)])?
            .call("Delete", &[])?;
        Ok(())
    }

    /// Returns the copy's name; Excel renames it to `Name (n)` on a clash.
    pub fn copy_sheet_to_end(&self, source: u64, sheet: &str, target: u64) -> Result<String, String> {
        let target_sheets = self.workbook(target)?.object("Worksheets", &[])?;
        let last = target_sheets.object("Item", &[dispatch::from_i32(target_sheets.count()?)])?;
        // Worksheet.Copy(Before, After)
        self.sheet(source, sheet)?.call(
            "Copy",
            &[dispatch::missing(), dispatch::from_dispatch(&last)],
        )?;
        let copy = target_sheets.object("Item", &[dispatch::from_i32(target_sheets.count()?)])?;
        match dispatch::to_scalar(&copy.get("Name", &[])?) {
            Scalar::Text(name) => Ok(name),
            _ => Err(format!("copy of worksheet '{sheet}' has no name")),
        }
    }

    pub fn save_workbook(&self, handle: u64) -> Result<(), String> {
        self.workbook(handle)?.call("Save", &[])?;
        Ok(())
    }

    pub fn close_workbook(&mut self, handle: u64) -> Result<(), String> {
        let wb = self
            .workbooks
            .remove(&handle)
            .ok_or_else(|| format!("Unknown workbook handle: {handle}"))?;
        wb.call("Close", &[dispatch::from_bool(false)])?;
        Ok(())
    }

    /// Close every workbook without saving and quit Excel.
    pub fn shutdown(mut self) -> Result<(), String> {
        let handles: Vec<u64> = self.workbooks.keys().copied().collect();
        for handle in handles {
            if let Err(e) = self.close_workbook(handle) {
                eprintln!("[tracker-forge-bridge] closing workbook {handle} failed: {e}");
            }
        }
        self.app.call("Quit", &[])?;
        Ok(())
    }
}

fn as_workbook(v: &windows::Win32::System::Variant::VARIANT) -> Result<DispatchObject, String> {
    dispatch::to_object(v, "Workbooks.Open")
}
