//! Worksheet type

use std::collections::BTreeMap;

use crate::cell::{CellAddress, CellData, CellRange, CellValue};
use crate::conditional_format::ConditionalFormatRule;
use crate::error::{Error, Result};
use crate::style::{Color, Style};

/// A worksheet (single sheet in a workbook)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Populated cells, ordered row-major
    #[cfg_attr(feature = "serde", serde(with = "cell_entries", default))]
    cells: BTreeMap<CellAddress, CellData>,
    /// Conditional formatting rules, in evaluation order
    #[cfg_attr(feature = "serde", serde(default))]
    conditional_formats: Vec<ConditionalFormatRule>,
    /// Custom column widths
    #[cfg_attr(feature = "serde", serde(default))]
    column_widths: BTreeMap<u16, f64>,
    /// Tab color
    #[cfg_attr(feature = "serde", serde(default))]
    tab_color: Option<Color>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            conditional_formats: Vec::new(),
            column_widths: BTreeMap::new(),
            tab_color: None,
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Get the tab color
    pub fn tab_color(&self) -> Option<Color> {
        self.tab_color
    }

    /// Set the tab color
    pub fn set_tab_color(&mut self, color: Option<Color>) {
        self.tab_color = color;
    }

    // === Cells ===

    /// Get cell data by A1 address
    pub fn cell(&self, address: &str) -> Result<Option<&CellData>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cells.get(&addr))
    }

    /// Get cell data by row/column
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.cells.get(&CellAddress::new(row, col))
    }

    /// Get a cell's value by A1 address (`Empty` for unpopulated cells)
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get a cell's value by row/column
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cell_at(row, col)
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    /// Get a cell's style, if it has a non-default one
    pub fn cell_style(&self, address: &str) -> Result<Option<&Style>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cell_style_at(addr.row, addr.col))
    }

    /// Get a cell's style by row/column, if it has a non-default one
    pub fn cell_style_at(&self, row: u32, col: u16) -> Option<&Style> {
        self.cell_at(row, col)
            .map(|c| &c.style)
            .filter(|s| !s.is_default())
    }

    /// Set a cell value by A1 address, keeping its style
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value);
        Ok(())
    }

    /// Set a cell value by row/column, keeping its style
    pub fn set_cell_value_at<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) {
        let addr = CellAddress::new(row, col);
        self.update_cell(addr, |cell| cell.value = value.into());
    }

    /// Set a cell style by A1 address, keeping its value
    pub fn set_cell_style(&mut self, address: &str, style: &Style) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_style_at(addr.row, addr.col, style);
        Ok(())
    }

    /// Set a cell style by row/column, keeping its value
    pub fn set_cell_style_at(&mut self, row: u32, col: u16, style: &Style) {
        let addr = CellAddress::new(row, col);
        self.update_cell(addr, |cell| cell.style = style.clone());
    }

    /// Remove value and style from a cell
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        self.cells.remove(&CellAddress::new(row, col));
    }

    /// Iterate over populated cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (&CellAddress, &CellData)> {
        self.cells.iter()
    }

    /// The smallest range covering every populated cell
    pub fn used_range(&self) -> Option<CellRange> {
        let mut iter = self.cells.keys();
        let first = iter.next()?;
        let (mut min_col, mut max_col) = (first.col, first.col);
        let mut max_row = first.row;
        for addr in iter {
            min_col = min_col.min(addr.col);
            max_col = max_col.max(addr.col);
            max_row = max_row.max(addr.row);
        }
        Some(CellRange::from_indices(first.row, min_col, max_row, max_col))
    }

    /// Raw values of a range, row by row
    pub fn range_values(&self, range: &CellRange) -> Vec<Vec<CellValue>> {
        self.range_rows(range, |row, col| self.get_value_at(row, col))
    }

    /// Values and styles of a range, row by row (unpopulated cells are defaults)
    pub fn range_cells(&self, range: &CellRange) -> Vec<Vec<CellData>> {
        self.range_rows(range, |row, col| {
            self.cell_at(row, col).cloned().unwrap_or_default()
        })
    }

    /// Overwrite the values of a range, keeping each cell's style
    pub fn write_values(&mut self, range: &CellRange, rows: &[Vec<CellValue>]) -> Result<()> {
        check_shape(range, rows)?;
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let addr = CellAddress::new(range.start.row + r as u32, range.start.col + c as u16);
                self.update_cell(addr, |cell| cell.value = value.clone());
            }
        }
        Ok(())
    }

    /// Overwrite the styles of a range, keeping each cell's value
    pub fn write_styles(&mut self, range: &CellRange, rows: &[Vec<Style>]) -> Result<()> {
        check_shape(range, rows)?;
        for (r, row) in rows.iter().enumerate() {
            for (c, style) in row.iter().enumerate() {
                let addr = CellAddress::new(range.start.row + r as u32, range.start.col + c as u16);
                self.update_cell(addr, |cell| cell.style = style.clone());
            }
        }
        Ok(())
    }

    fn range_rows<T>(&self, range: &CellRange, mut f: impl FnMut(u32, u16) -> T) -> Vec<Vec<T>> {
        (range.start.row..=range.end.row)
            .map(|row| (range.start.col..=range.end.col).map(|col| f(row, col)).collect())
            .collect()
    }

    /// Apply `f` to a cell, dropping it again if it ends up blank
    fn update_cell(&mut self, addr: CellAddress, f: impl FnOnce(&mut CellData)) {
        let cell = self.cells.entry(addr).or_default();
        f(cell);
        if cell.is_blank() {
            self.cells.remove(&addr);
        }
    }

    // === Columns ===

    /// Get a column width, if customized
    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// Set a custom column width
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    // === Conditional Formatting ===

    /// Add a conditional formatting rule after the existing ones
    pub fn add_conditional_format(&mut self, rule: ConditionalFormatRule) {
        self.conditional_formats.push(rule);
    }

    /// Get all conditional formatting rules
    pub fn conditional_formats(&self) -> &[ConditionalFormatRule] {
        &self.conditional_formats
    }

    /// Get conditional formatting rules for a specific cell
    pub fn conditional_formats_at(&self, row: u32, col: u16) -> Vec<&ConditionalFormatRule> {
        self.conditional_formats
            .iter()
            .filter(|r| r.applies_to(row, col))
            .collect()
    }

    /// Rules touching `range`, in sheet order
    pub fn conditional_formats_in(&self, range: &CellRange) -> Vec<&ConditionalFormatRule> {
        self.conditional_formats
            .iter()
            .filter(|r| r.intersects(range))
            .collect()
    }

    /// Detach the `index`-th rule touching `range` from that range.
    ///
    /// The rule survives outside the range and is removed once it covers nothing.
    /// Returns `false` if there is no such rule.
    pub fn detach_conditional_format(&mut self, range: &CellRange, index: usize) -> bool {
        let Some(pos) = self
            .conditional_formats
            .iter()
            .enumerate()
            .filter(|(_, r)| r.intersects(range))
            .nth(index)
            .map(|(pos, _)| pos)
        else {
            return false;
        };

        if !self.conditional_formats[pos].detach(range) {
            self.conditional_formats.remove(pos);
        }
        true
    }

    /// Get the number of conditional formatting rules
    pub fn conditional_format_count(&self) -> usize {
        self.conditional_formats.len()
    }

    /// Next priority value after every existing rule
    pub fn next_conditional_priority(&self) -> u32 {
        self.conditional_formats
            .iter()
            .map(|r| r.priority)
            .max()
            .map_or(1, |p| p + 1)
    }
}

fn check_shape<T>(range: &CellRange, rows: &[Vec<T>]) -> Result<()> {
    let (height, width) = range.dimensions();
    let got_cols = rows.first().map_or(0, Vec::len);
    if rows.len() != height as usize || rows.iter().any(|r| r.len() != width as usize) {
        return Err(Error::ShapeMismatch {
            range: range.to_string(),
            rows: height,
            cols: width,
            got_rows: rows.len(),
            got_cols,
        });
    }
    Ok(())
}

/// JSON object keys must be strings, so cells travel as `[address, data]` pairs.
#[cfg(feature = "serde")]
mod cell_entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::cell::{CellAddress, CellData};

    pub fn serialize<S: Serializer>(
        cells: &BTreeMap<CellAddress, CellData>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(cells.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<CellAddress, CellData>, D::Error> {
        let entries = Vec::<(CellAddress, CellData)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
