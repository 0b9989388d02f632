//! Conditional formatting
//!
//! A rule applies a format to the cells of its ranges when its condition holds.
//! A worksheet keeps its rules in an ordered list; the merge engine moves rules
//! between regions with [`ConditionalFormatRule::clipped_to`],
//! [`ConditionalFormatRule::translated`] and [`ConditionalFormatRule::detach`].
//!
//! ## Example
//!
//! ```rust
//! use tracker_forge_core::{CellRange, ConditionalFormatRule};
//! use tracker_forge_core::style::{Color, Style};
//!
//! let rule = ConditionalFormatRule::cell_is_greater_than("100")
//!     .with_range(CellRange::parse("A1:A10").unwrap())
//!     .with_format(Style::new().fill_color(Color::rgb(255, 199, 206)));
//!
//! assert!(rule.applies_to(4, 0));
//! ```

use crate::cell::CellRange;
use crate::style::{Color, Style};

/// A conditional formatting rule
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionalFormatRule {
    /// Rule type
    pub rule_type: CfRuleType,
    /// Cell ranges this rule applies to
    pub ranges: Vec<CellRange>,
    /// Priority (lower = higher priority)
    pub priority: u32,
    /// Stop processing further rules if this one matches
    pub stop_if_true: bool,
    /// Format to apply when rule matches
    pub format: Option<Style>,
}

impl ConditionalFormatRule {
    /// Create a new conditional format rule
    pub fn new(rule_type: CfRuleType) -> Self {
        Self {
            rule_type,
            ranges: Vec::new(),
            priority: 1,
            stop_if_true: false,
            format: None,
        }
    }

    /// Highlight cells greater than a value
    pub fn cell_is_greater_than(value: impl Into<String>) -> Self {
        Self::new(CfRuleType::CellIs {
            operator: CfOperator::GreaterThan,
            formula1: value.into(),
            formula2: None,
        })
    }

    /// Highlight cells equal to a value
    pub fn cell_is_equal_to(value: impl Into<String>) -> Self {
        Self::new(CfRuleType::CellIs {
            operator: CfOperator::Equal,
            formula1: value.into(),
            formula2: None,
        })
    }

    /// Highlight cells where formula evaluates to TRUE
    pub fn expression(formula: impl Into<String>) -> Self {
        Self::new(CfRuleType::Expression {
            formula: formula.into(),
        })
    }

    /// Highlight cells containing some text
    pub fn contains_text(text: impl Into<String>) -> Self {
        Self::new(CfRuleType::ContainsText { text: text.into() })
    }

    /// Add a range this rule applies to
    pub fn with_range(mut self, range: CellRange) -> Self {
        self.ranges.push(range);
        self
    }

    /// Set the format applied when the rule matches
    pub fn with_format(mut self, style: Style) -> Self {
        self.format = Some(style);
        self
    }

    /// Set priority
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Check if this rule applies to a specific cell
    pub fn applies_to(&self, row: u32, col: u16) -> bool {
        self.ranges.iter().any(|r| {
            row >= r.start.row && row <= r.end.row && col >= r.start.col && col <= r.end.col
        })
    }

    /// Check if any of the rule's ranges touches `range`
    pub fn intersects(&self, range: &CellRange) -> bool {
        self.ranges.iter().any(|r| r.overlaps(range))
    }

    /// The part of this rule that lies inside `range`, if any
    pub fn clipped_to(&self, range: &CellRange) -> Option<Self> {
        let ranges: Vec<CellRange> = self
            .ranges
            .iter()
            .filter_map(|r| r.intersect(range))
            .collect();
        if ranges.is_empty() {
            return None;
        }
        Some(Self {
            ranges,
            ..self.clone()
        })
    }

    /// The same rule moved by a row/column delta; `None` if any range leaves the sheet
    pub fn translated(&self, row_delta: i64, col_delta: i64) -> Option<Self> {
        let ranges = self
            .ranges
            .iter()
            .map(|r| r.translate(row_delta, col_delta))
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            ranges,
            ..self.clone()
        })
    }

    /// Remove `range` from the area this rule covers.
    ///
    /// Returns `false` once nothing is left, meaning the rule should be dropped.
    pub fn detach(&mut self, range: &CellRange) -> bool {
        self.ranges = self.ranges.iter().flat_map(|r| r.subtract(range)).collect();
        !self.ranges.is_empty()
    }
}

/// Types of conditional formatting rules
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CfRuleType {
    /// Cell value comparison (e.g., "greater than 100")
    CellIs {
        operator: CfOperator,
        formula1: String,
        formula2: Option<String>,
    },

    /// Formula evaluates to TRUE
    Expression { formula: String },

    /// Two- or three-point color scale
    ColorScale {
        min: Color,
        mid: Option<Color>,
        max: Color,
    },

    /// Data bar (in-cell bar chart)
    DataBar { color: Color },

    /// Top/bottom N values
    Top10 { rank: u32, percent: bool, bottom: bool },

    /// Contains text
    ContainsText { text: String },

    /// Duplicate values
    DuplicateValues,

    /// Blank cells
    ContainsBlanks,
}

/// Operators for CellIs rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CfOperator {
    #[default]
    Between,
    NotBetween,
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}
