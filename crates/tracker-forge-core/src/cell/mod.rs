//! Cell-related types
//!
//! - [`CellValue`] - The value stored in a cell
//! - [`CellAddress`] / [`CellRange`] - Where a cell or block of cells lives
//! - [`CellData`] - A cell's value together with its style

mod address;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use value::{CellError, CellValue};

use crate::style::Style;

/// Everything stored for one populated cell
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellData {
    /// The cell's value
    pub value: CellValue,
    /// The cell's visual formatting
    #[cfg_attr(feature = "serde", serde(default))]
    pub style: Style,
}

impl CellData {
    /// Create a cell with a value and the default style
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            style: Style::default(),
        }
    }

    /// Create a cell with a value and a style
    pub fn with_style(value: CellValue, style: Style) -> Self {
        Self { value, style }
    }

    /// A cell with no value and default formatting carries no information
    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.style.is_default()
    }
}
