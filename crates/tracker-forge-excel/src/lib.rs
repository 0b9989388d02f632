//! Native client for automating Excel through a WINE bridge process.
//!
//! This crate spawns a Windows `.exe` under WINE that automates Excel through COM,
//! communicating over JSON-over-stdio. Every call blocks until the bridge answers.
//!
//! # Architecture
//!
//! ```text
//! tracker-forge (native)
//!     └── ExcelBridge (this crate)
//!           └── spawns: wine tracker-forge-bridge.exe
//!                 └── COM: Excel.Application (hidden)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use tracker_forge_excel::{ExcelBridge, ExcelBridgeConfig, PasteLayer};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut bridge = ExcelBridge::start(ExcelBridgeConfig::default())?;
//!     let source = bridge.open_workbook("data/acme.xlsx".as_ref())?;
//!     let target = bridge.open_workbook("out/temp_1.xlsx".as_ref())?;
//!     bridge.copy_range(source, "Tracker", "A2:H100")?;
//!     bridge.paste_special(target, "Tracker", "A2:H100", PasteLayer::Values)?;
//!     bridge.clear_clipboard()?;
//!     bridge.save_workbook(target)?;
//!     bridge.shutdown()?;
//!     Ok(())
//! }
//! ```

mod bridge;

pub use bridge::{linux_to_wine_path, BridgeError, ExcelBridge, ExcelBridgeConfig, WorkbookHandle};
pub use tracker_forge_protocol::{CellError, CellValue, PasteLayer};
