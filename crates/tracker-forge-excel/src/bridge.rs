//! Subprocess management and JSON IPC for the WINE bridge process.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};

use tracker_forge_protocol::{
    CellValue, Command as BridgeCommand, PasteLayer, Request, Response, ResponseData,
    ResponseResult,
};

/// Errors from the Excel COM bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to spawn WINE bridge process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Bridge process not running")]
    NotRunning,

    #[error("Failed to send command to bridge: {0}")]
    SendFailed(String),

    #[error("Failed to read response from bridge: {0}")]
    ReadFailed(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Bridge returned error: {0}")]
    BridgeError(String),

    #[error("Response {got} does not answer request {expected}")]
    OutOfSequence { expected: u64, got: u64 },

    #[error("Unexpected response data")]
    UnexpectedResponse,

    #[error("WINE not found. Install WINE and ensure 'wine' is in PATH.")]
    WineNotFound,

    #[error("Bridge executable not found at: {0}")]
    BridgeExeNotFound(String),
}

/// Configuration for the Excel COM bridge.
#[derive(Debug, Clone)]
pub struct ExcelBridgeConfig {
    /// Path to the `tracker-forge-bridge.exe` Windows executable.
    /// If None, will search in common locations relative to the current binary.
    pub bridge_exe_path: Option<PathBuf>,

    /// Path to the WINE executable. Defaults to "wine".
    pub wine_path: PathBuf,

    /// Optional WINEPREFIX to use (for isolating the WINE environment).
    pub wine_prefix: Option<PathBuf>,
}

impl Default for ExcelBridgeConfig {
    fn default() -> Self {
        Self {
            bridge_exe_path: None,
            wine_path: PathBuf::from("wine"),
            wine_prefix: None,
        }
    }
}

/// Bridge-side identity of an open workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkbookHandle(pub u64);

/// Request/response correlation over one line-oriented channel.
pub(crate) struct Transport<R, W> {
    reader: R,
    writer: W,
    next_id: u64,
}

impl<R: BufRead, W: Write> Transport<R, W> {
    pub(crate) fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            next_id: 1,
        }
    }

    /// Send a command and wait for its response.
    pub(crate) fn call(&mut self, command: BridgeCommand) -> Result<Option<ResponseData>, BridgeError> {
        let id = self.next_id;
        self.next_id += 1;

        let json = serde_json::to_string(&Request { id, command })?;
        tracing::trace!(id, request = %json, "bridge request");

        writeln!(self.writer, "{json}").map_err(|e| BridgeError::SendFailed(e.to_string()))?;
        self.writer
            .flush()
            .map_err(|e| BridgeError::SendFailed(e.to_string()))?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| BridgeError::ReadFailed(e.to_string()))?;
        if line.is_empty() {
            return Err(BridgeError::NotRunning);
        }

        let response: Response = serde_json::from_str(&line)?;
        if response.id != id {
            return Err(BridgeError::OutOfSequence {
                expected: id,
                got: response.id,
            });
        }

        match response.result {
            ResponseResult::Ok { data } => Ok(data),
            ResponseResult::Error { message } => Err(BridgeError::BridgeError(message)),
        }
    }
}

/// The main handle for communicating with the Excel COM bridge.
///
/// Owns the WINE subprocess. Dropping the bridge without calling
/// [`ExcelBridge::shutdown`] kills the process.
pub struct ExcelBridge {
    child: Option<Child>,
    transport: Transport<BufReader<ChildStdout>, ChildStdin>,
}

impl ExcelBridge {
    /// Start the bridge process and initialize a hidden Excel instance.
    pub fn start(config: ExcelBridgeConfig) -> Result<Self, BridgeError> {
        let exe_path = config.bridge_exe_path.unwrap_or_else(find_bridge_exe);

        if !exe_path.exists() {
            return Err(BridgeError::BridgeExeNotFound(
                exe_path.display().to_string(),
            ));
        }

        let mut cmd = std::process::Command::new(&config.wine_path);
        if let Some(prefix) = &config.wine_prefix {
            cmd.env("WINEPREFIX", prefix);
        }
        cmd.arg(&exe_path);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit()); // Bridge diagnostics go to our stderr

        tracing::info!(exe = %exe_path.display(), "starting Excel bridge");
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BridgeError::WineNotFound
            } else {
                BridgeError::SpawnFailed(e)
            }
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(BridgeError::NotRunning);
        };

        let mut bridge = Self {
            child: Some(child),
            transport: Transport::new(BufReader::new(stdout), stdin),
        };

        bridge.transport.call(BridgeCommand::Init)?;
        Ok(bridge)
    }

    fn expect_ack(&mut self, command: BridgeCommand) -> Result<(), BridgeError> {
        if self.child.is_none() {
            return Err(BridgeError::NotRunning);
        }
        self.transport.call(command)?;
        Ok(())
    }

    fn expect_data(&mut self, command: BridgeCommand) -> Result<ResponseData, BridgeError> {
        if self.child.is_none() {
            return Err(BridgeError::NotRunning);
        }
        self.transport
            .call(command)?
            .ok_or(BridgeError::UnexpectedResponse)
    }

    /// Open an existing workbook. Linux paths are converted to WINE paths.
    pub fn open_workbook(&mut self, path: &Path) -> Result<WorkbookHandle, BridgeError> {
        let data = self.expect_data(BridgeCommand::OpenWorkbook {
            path: linux_to_wine_path(path),
        })?;
        match data {
            ResponseData::WorkbookHandle { workbook } => Ok(WorkbookHandle(workbook)),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    /// Worksheet names in tab order.
    pub fn list_sheets(&mut self, workbook: WorkbookHandle) -> Result<Vec<String>, BridgeError> {
        match self.expect_data(BridgeCommand::ListSheets {
            workbook: workbook.0,
        })? {
            ResponseData::Sheets { sheets } => Ok(sheets),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    /// Ask Excel to resolve a range on a sheet.
    pub fn check_range(
        &mut self,
        workbook: WorkbookHandle,
        sheet: &str,
        range: &str,
    ) -> Result<(), BridgeError> {
        self.expect_ack(BridgeCommand::CheckRange {
            workbook: workbook.0,
            sheet: sheet.to_string(),
            range: range.to_string(),
        })
    }

    /// Get one cell's value.
    pub fn get_cell_value(
        &mut self,
        workbook: WorkbookHandle,
        sheet: &str,
        cell: &str,
    ) -> Result<CellValue, BridgeError> {
        match self.expect_data(BridgeCommand::GetCellValue {
            workbook: workbook.0,
            sheet: sheet.to_string(),
            cell: cell.to_string(),
        })? {
            ResponseData::Value { value } => Ok(value),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    /// Set one cell's value.
    pub fn set_cell_value(
        &mut self,
        workbook: WorkbookHandle,
        sheet: &str,
        cell: &str,
        value: CellValue,
    ) -> Result<(), BridgeError> {
        self.expect_ack(BridgeCommand::SetCellValue {
            workbook: workbook.0,
            sheet: sheet.to_string(),
            cell: cell.to_string(),
            value,
        })
    }

    /// Copy a range to the clipboard.
    pub fn copy_range(
        &mut self,
        workbook: WorkbookHandle,
        sheet: &str,
        range: &str,
    ) -> Result<(), BridgeError> {
        self.expect_ack(BridgeCommand::CopyRange {
            workbook: workbook.0,
            sheet: sheet.to_string(),
            range: range.to_string(),
        })
    }

    /// Paste one layer of the clipboard onto a range.
    pub fn paste_special(
        &mut self,
        workbook: WorkbookHandle,
        sheet: &str,
        range: &str,
        layer: PasteLayer,
    ) -> Result<(), BridgeError> {
        self.expect_ack(BridgeCommand::PasteSpecial {
            workbook: workbook.0,
            sheet: sheet.to_string(),
            range: range.to_string(),
            layer,
        })
    }

    /// Leave cut/copy mode.
    pub fn clear_clipboard(&mut self) -> Result<(), BridgeError> {
        self.expect_ack(BridgeCommand::ClearClipboard)
    }

    /// Number of conditional formats attached to a range.
    pub fn count_format_conditions(
        &mut self,
        workbook: WorkbookHandle,
        sheet: &str,
        range: &str,
    ) -> Result<usize, BridgeError> {
        match self.expect_data(BridgeCommand::CountFormatConditions {
            workbook: workbook.0,
            sheet: sheet.to_string(),
            range: range.to_string(),
        })? {
            ResponseData::Count { count } => Ok(count as usize),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    /// Delete the `index`-th (0-based) conditional format of a range.
    pub fn delete_format_condition(
        &mut self,
        workbook: WorkbookHandle,
        sheet: &str,
        range: &str,
        index: usize,
    ) -> Result<(), BridgeError> {
        let index = u32::try_from(index).map_err(|_| BridgeError::UnexpectedResponse)?;
        self.expect_ack(BridgeCommand::DeleteFormatCondition {
            workbook: workbook.0,
            sheet: sheet.to_string(),
            range: range.to_string(),
            index,
        })
    }

    /// Copy a worksheet after the last sheet of another workbook.
    ///
    /// Returns the copy's name, which Excel suffixes with ` (n)` when the
    /// target already has a sheet of that name in any letter case.
    pub fn copy_sheet_to_end(
        &mut self,
        source: WorkbookHandle,
        sheet: &str,
        target: WorkbookHandle,
    ) -> Result<String, BridgeError> {
        match self.expect_data(BridgeCommand::CopySheetToEnd {
            source_workbook: source.0,
            sheet: sheet.to_string(),
            target_workbook: target.0,
        })? {
            ResponseData::SheetName { sheet } => Ok(sheet),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    /// Save a workbook in place.
    pub fn save_workbook(&mut self, workbook: WorkbookHandle) -> Result<(), BridgeError> {
        self.expect_ack(BridgeCommand::SaveWorkbook {
            workbook: workbook.0,
        })
    }

    /// Close a workbook without saving.
    pub fn close_workbook(&mut self, workbook: WorkbookHandle) -> Result<(), BridgeError> {
        self.expect_ack(BridgeCommand::CloseWorkbook {
            workbook: workbook.0,
        })
    }

    /// Shut down the bridge: close all workbooks, quit Excel, and wait for the process.
    ///
    /// Calling it again after a successful shutdown is a no-op.
    pub fn shutdown(&mut self) -> Result<(), BridgeError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let result = self.transport.call(BridgeCommand::Shutdown);
        if result.is_err() {
            let _ = child.kill();
        }
        let _ = child.wait();
        tracing::info!("Excel bridge stopped");

        result.map(|_| ())
    }
}

impl Drop for ExcelBridge {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::warn!("Excel bridge dropped without shutdown, killing process");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Convert a Linux filesystem path to a WINE (Windows) path.
///
/// WINE maps `/` to `Z:\`, so `/home/user/file.xlsx` becomes `Z:\home\user\file.xlsx`.
pub fn linux_to_wine_path(linux_path: &Path) -> String {
    let abs = if linux_path.is_absolute() {
        linux_path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(linux_path)
    };

    format!("Z:{}", abs.display()).replace('/', "\\")
}

/// Attempt to locate the bridge exe relative to the current executable or in common paths.
fn find_bridge_exe() -> PathBuf {
    if let Ok(mut exe) = std::env::current_exe() {
        exe.pop();
        let candidate = exe.join("tracker-forge-bridge.exe");
        if candidate.exists() {
            return candidate;
        }
    }

    for profile in ["release", "debug"] {
        let target_path = PathBuf::from(format!(
            "target/x86_64-pc-windows-gnu/{profile}/tracker-forge-bridge.exe"
        ));
        if target_path.exists() {
            return target_path;
        }
    }

    PathBuf::from("tracker-forge-bridge.exe")
}
