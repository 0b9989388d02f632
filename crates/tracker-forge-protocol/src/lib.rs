//! Shared protocol types for communication between the native client and the
//! Windows COM bridge process running under WINE.
//!
//! The protocol is JSON-over-stdio: one JSON object per line in each direction.
//! Ranges are A1-style strings resolved by Excel on the named sheet.

use serde::{Deserialize, Serialize};

/// A command sent from the client to the bridge process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Monotonically increasing request ID for correlating responses.
    pub id: u64,
    /// The command to execute.
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the client can send to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum Command {
    /// Initialize COM and create a hidden Excel.Application instance.
    Init,

    /// Open an existing workbook from a file path (Windows path).
    OpenWorkbook { path: String },

    /// List the names of the workbook's worksheets, in tab order.
    ListSheets { workbook: u64 },

    /// Resolve a range without touching it.
    CheckRange {
        workbook: u64,
        sheet: String,
        range: String,
    },

    /// Get a single cell's displayed value.
    GetCellValue {
        workbook: u64,
        sheet: String,
        cell: String,
    },

    /// Set a single cell's value.
    SetCellValue {
        workbook: u64,
        sheet: String,
        cell: String,
        value: CellValue,
    },

    /// Copy a range to the clipboard.
    CopyRange {
        workbook: u64,
        sheet: String,
        range: String,
    },

    /// Paste one layer of the clipboard onto a range.
    PasteSpecial {
        workbook: u64,
        sheet: String,
        range: String,
        layer: PasteLayer,
    },

    /// Leave cut/copy mode, dropping the clipboard contents.
    ClearClipboard,

    /// Count the conditional formats attached to a range.
    CountFormatConditions {
        workbook: u64,
        sheet: String,
        range: String,
    },

    /// Delete one conditional format of a range (0-based).
    DeleteFormatCondition {
        workbook: u64,
        sheet: String,
        range: String,
        index: u32,
    },

    /// Copy a whole worksheet after the last sheet of another workbook.
    /// Answers with the name the copy received.
    CopySheetToEnd {
        source_workbook: u64,
        sheet: String,
        target_workbook: u64,
    },

    /// Save the workbook in place.
    SaveWorkbook { workbook: u64 },

    /// Close a workbook without saving.
    CloseWorkbook { workbook: u64 },

    /// Shut down the bridge: close all workbooks, quit Excel, uninitialize COM.
    Shutdown,
}

/// The layer of the clipboard a paste-special transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasteLayer {
    Values,
    Formats,
    ConditionalFormats,
}

impl PasteLayer {
    /// The `XlPasteType` constant Excel expects for this layer.
    pub fn xl_paste_type(self) -> i32 {
        match self {
            PasteLayer::Values => -4163,
            PasteLayer::Formats => -4122,
            // xlPasteAllMergingConditionalFormats
            PasteLayer::ConditionalFormats => 14,
        }
    }
}

/// A cell value that can be sent to/from Excel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Error(CellError),
}

/// Excel error values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellError {
    pub code: String,
}

/// A response sent from the bridge back to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// The request ID this response corresponds to.
    pub id: u64,
    /// The result of the command.
    #[serde(flatten)]
    pub result: ResponseResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ResponseResult {
    #[serde(rename = "ok")]
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Data returned in successful responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Handle to a newly opened workbook.
    WorkbookHandle { workbook: u64 },
    /// Worksheet names.
    Sheets { sheets: Vec<String> },
    /// A cell value.
    Value { value: CellValue },
    /// A count (e.g. of conditional formats).
    Count { count: u32 },
    /// The name a copied worksheet received.
    SheetName { sheet: String },
}

impl ResponseResult {
    /// A successful result without data.
    pub fn ok() -> Self {
        ResponseResult::Ok { data: None }
    }

    /// A successful result carrying data.
    pub fn with_data(data: ResponseData) -> Self {
        ResponseResult::Ok { data: Some(data) }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => write!(f, "<empty>"),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Error(e) => write!(f, "{}", e.code),
        }
    }
}
