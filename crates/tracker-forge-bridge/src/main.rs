//! tracker-forge-bridge: drives a hidden Excel through COM on behalf of
//! `tracker-forge-excel`, reading one JSON request per line on stdin and
//! answering with one JSON response per line on stdout.
//!
//! Cross-compiled for `x86_64-pc-windows-gnu` and run under WINE.
//! stdout carries only protocol traffic; diagnostics go to stderr.

#[cfg(windows)]
mod dispatch;
#[cfg(windows)]
mod excel;
#[cfg_attr(not(windows), allow(dead_code))]
mod values;

#[cfg(not(windows))]
fn main() {
    eprintln!("tracker-forge-bridge must be built for Windows (--target x86_64-pc-windows-gnu)");
    eprintln!("and run under WINE.");
    std::process::exit(1);
}

#[cfg(windows)]
fn main() {
    use std::io::{self, BufRead, Write};

    use tracker_forge_protocol::{Command, Request, Response, ResponseResult};

    eprintln!("[tracker-forge-bridge] starting");

    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    let mut excel: Option<excel::ExcelApp> = None;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("[tracker-forge-bridge] stdin read error: {e}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (response, shutting_down) = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                let response = Response {
                    id: request.id,
                    result: handle(&mut excel, &request.command),
                };
                let done = matches!(request.command, Command::Shutdown)
                    && matches!(response.result, ResponseResult::Ok { .. });
                (response, done)
            }
            Err(e) => {
                eprintln!("[tracker-forge-bridge] bad request {line:?}: {e}");
                let result = ResponseResult::Error {
                    message: format!("JSON parse error: {e}"),
                };
                (Response { id: 0, result }, false)
            }
        };

        match serde_json::to_string(&response) {
            Ok(json) => {
                let _ = writeln!(out, "{json}");
                let _ = out.flush();
            }
            Err(e) => eprintln!("[tracker-forge-bridge] cannot encode response: {e}"),
        }

        if shutting_down {
            break;
        }
    }

    if let Some(app) = excel.take() {
        eprintln!("[tracker-forge-bridge] stdin closed, quitting Excel");
        let _ = app.shutdown();
        uninit_com();
    }
    eprintln!("[tracker-forge-bridge] exiting");
}

#[cfg(windows)]
fn handle(
    excel: &mut Option<excel::ExcelApp>,
    command: &tracker_forge_protocol::Command,
) -> tracker_forge_protocol::ResponseResult {
    use tracker_forge_protocol::{Command, ResponseData, ResponseResult};

    let outcome: Result<Option<ResponseData>, String> = match command {
        Command::Init => return init(excel),
        Command::Shutdown => {
            return match excel.take() {
                Some(app) => match app.shutdown() {
                    Ok(()) => {
                        uninit_com();
                        ResponseResult::ok()
                    }
                    Err(e) => ResponseResult::Error {
                        message: format!("Shutdown failed: {e}"),
                    },
                },
                None => ResponseResult::ok(),
            }
        }
        other => match excel.as_mut() {
            None => Err("Excel not initialized. Send 'Init' first.".to_string()),
            Some(app) => run(app, other),
        },
    };

    match outcome {
        Ok(data) => ResponseResult::Ok { data },
        Err(message) => ResponseResult::Error { message },
    }
}

#[cfg(windows)]
fn run(
    app: &mut excel::ExcelApp,
    command: &tracker_forge_protocol::Command,
) -> Result<Option<tracker_forge_protocol::ResponseData>, String> {
    use tracker_forge_protocol::{Command, ResponseData};

    let none = |r: Result<(), String>| r.map(|()| None);

    match command {
        Command::OpenWorkbook { path } => app
            .open_workbook(path)
            .map(|workbook| Some(ResponseData::WorkbookHandle { workbook })),
        Command::ListSheets { workbook } => app
            .list_sheets(*workbook)
            .map(|sheets| Some(ResponseData::Sheets { sheets })),
        Command::CheckRange {
            workbook,
            sheet,
            range,
        } => none(app.check_range(*workbook, sheet, range)),
        Command::GetCellValue {
            workbook,
            sheet,
            cell,
        } => app
            .get_cell_value(*workbook, sheet, cell)
            .map(|value| Some(ResponseData::Value { value })),
        Command::SetCellValue {
            workbook,
            sheet,
            cell,
            value,
        } => none(app.set_cell_value(*workbook, sheet, cell, value)),
        Command::CopyRange {
            workbook,
            sheet,
            range,
        } => none(app.copy_range(*workbook, sheet, range)),
        Command::PasteSpecial {
            workbook,
            sheet,
            range,
            layer,
        } => none(app.paste_special(*workbook, sheet, range, *layer)),
        Command::ClearClipboard => none(app.clear_clipboard()),
        Command::CountFormatConditions {
            workbook,
            sheet,
            range,
        } => app
            .count_format_conditions(*workbook, sheet, range)
            .map(|count| Some(ResponseData::Count { count })),
        Command::DeleteFormatCondition {
            workbook,
            sheet,
            range,
            index,
        } => none(app.delete_format_condition(*workbook, sheet, range, *index)),
        Command::CopySheetToEnd {
            source_workbook,
            sheet,
            target_workbook,
        } => app
            .copy_sheet_to_end(*source_workbook, sheet, *target_workbook)
            .map(|sheet| Some(ResponseData::SheetName { sheet })),
        Command::SaveWorkbook { workbook } => none(app.save_workbook(*workbook)),
        Command::CloseWorkbook { workbook } => none(app.close_workbook(*workbook)),
        Command::Init | Command::Shutdown => Ok(None),
    }
}

#[cfg(windows)]
fn init(excel: &mut Option<excel::ExcelApp>) -> tracker_forge_protocol::ResponseResult {
    use tracker_forge_protocol::ResponseResult;
    use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};

    if excel.is_some() {
        return ResponseResult::ok();
    }

    // Excel requires a single-threaded apartment
    if let Err(e) = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.ok() {
        return ResponseResult::Error {
            message: format!("CoInitializeEx failed: {e}"),
        };
    }

    match excel::ExcelApp::new() {
        Ok(app) => {
            eprintln!("[tracker-forge-bridge] Excel.Application ready");
            *excel = Some(app);
            ResponseResult::ok()
        }
        Err(e) => ResponseResult::Error {
            message: format!("Failed to create Excel.Application: {e}"),
        },
    }
}

#[cfg(windows)]
fn uninit_com() {
    unsafe { windows::Win32::System::Com::CoUninitialize() };
}
