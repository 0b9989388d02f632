//! # tracker-forge-core
//!
//! The spreadsheet model the tracker-forge engine merges into and out of.
//!
//! It covers what a region merge can observe or change:
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing and rectangular ranges
//! - [`CellValue`] - Cell contents, including formulas with cached results
//! - [`Style`] - The visual formatting layer (font, fill, border, number format)
//! - [`ConditionalFormatRule`] - Range-attached rules, kept in priority order per sheet
//! - [`Workbook`], [`Worksheet`] - Ordered, named sheets
//!
//! ## Example
//!
//! ```rust
//! use tracker_forge_core::{CellRange, CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_by_name_mut("Sheet1").unwrap();
//!
//! sheet.set_cell_value("A1", "Owner").unwrap();
//! sheet.set_cell_value("B1", 42.0).unwrap();
//!
//! let values = sheet.range_values(&CellRange::parse("A1:B1").unwrap());
//! assert_eq!(values[0][1], CellValue::Number(42.0));
//! ```

pub mod cell;
pub mod conditional_format;
pub mod error;
pub mod style;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellData, CellError, CellRange, CellValue};
pub use conditional_format::{CfOperator, CfRuleType, ConditionalFormatRule};
pub use error::{Error, Result};
pub use style::{
    BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle, NumberFormat, Style,
};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
