//! Cell values as `Range.Value2` exchanges them.
//!
//! `Value2` reports dates and currency as plain doubles. On assignment Excel
//! parses text the way it parses typed input, so text is written with a
//! leading apostrophe to keep it literal.

use tracker_forge_protocol::{CellError, CellValue};

/// A scalar read back from Excel.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Error(i32),
    Other(u16),
}

/// What to assign to `Range.Value2` for a wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value2 {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Error(i32),
}

/// `CY` is a 64-bit integer scaled by 10,000.
pub fn currency_to_f64(cy: i64) -> f64 {
    cy as f64 / 10_000.0
}

pub fn to_cell_value(scalar: Scalar) -> CellValue {
    match scalar {
        Scalar::Empty | Scalar::Other(_) => CellValue::Null,
        Scalar::Bool(b) => CellValue::Bool(b),
        Scalar::Number(n) => CellValue::Number(n),
        Scalar::Text(s) => CellValue::String(s),
        Scalar::Error(code) => CellValue::Error(CellError {
            code: error_literal(code).to_string(),
        }),
    }
}

pub fn to_value2(value: &CellValue) -> Value2 {
    match value {
        CellValue::Null => Value2::Empty,
        CellValue::Bool(b) => Value2::Bool(*b),
        CellValue::Number(n) => Value2::Number(*n),
        // Excel strips exactly one leading apostrophe and stores the rest as text
        CellValue::String(s) => Value2::Text(format!("'{s}")),
        CellValue::Error(e) => match error_scode(&e.code) {
            Some(scode) => Value2::Error(scode),
            None => Value2::Text(format!("'{}", e.code)),
        },
    }
}

const XL_ERR_BASE: u32 = 0x800A_0000;

const XL_ERRORS: [(i32, &str); 7] = [
    (2000, "#NULL!"),
    (2007, "#DIV/0!"),
    (2015, "#VALUE!"),
    (2023, "#REF!"),
    (2029, "#NAME?"),
    (2036, "#NUM!"),
    (2042, "#N/A"),
];

/// Excel reports cell errors as `0x800A0000 | xlErr*`.
pub fn error_literal(scode: i32) -> &'static str {
    XL_ERRORS
        .iter()
        .find(|(code, _)| *code == scode & 0xFFFF)
        .map_or("#VALUE!", |(_, literal)| literal)
}

pub fn error_scode(literal: &str) -> Option<i32> {
    XL_ERRORS
        .iter()
        .find(|(_, l)| l.eq_ignore_ascii_case(literal))
        .map(|(code, _)| (XL_ERR_BASE | *code as u32) as i32)
}
