//! JSON snapshots of the model keep everything a region merge can touch.
#![cfg(feature = "serde")]

use pretty_assertions::assert_eq;
use tracker_forge_core::style::{BorderLineStyle, Color, Style};
use tracker_forge_core::{CellRange, CellValue, ConditionalFormatRule, Workbook, Worksheet};

fn sample_workbook() -> Workbook {
    let mut sheet = Worksheet::new("Tracker");
    sheet.set_cell_value("A2", "Kickoff").unwrap();
    sheet.set_cell_value("B2", 0.75).unwrap();
    sheet.set_cell_value_at(1, 2, CellValue::formula("=B2*100", CellValue::Number(75.0)));
    sheet
        .set_cell_style(
            "B2",
            &Style::new()
                .number_format("0%")
                .outline(BorderLineStyle::Thin, Color::rgb(0, 0, 0)),
        )
        .unwrap();
    sheet.set_column_width(0, 32.5);
    sheet.add_conditional_format(
        ConditionalFormatRule::cell_is_greater_than("0.5")
            .with_range(CellRange::parse("B2:B100").unwrap())
            .with_format(Style::new().fill_color(Color::rgb(198, 239, 206))),
    );

    let mut wb = Workbook::empty();
    wb.push_worksheet(sheet).unwrap();
    wb.add_worksheet_with_name("Totals").unwrap();
    wb
}

#[test]
fn test_workbook_survives_json_snapshot() {
    let wb = sample_workbook();

    let json = serde_json::to_string_pretty(&wb).unwrap();
    let restored: Workbook = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, wb);
    let tracker = restored.worksheet_by_name("Tracker").unwrap();
    assert_eq!(tracker.get_value("C2").unwrap().computed(), CellValue::Number(75.0));
    assert_eq!(tracker.conditional_formats_at(50, 1).len(), 1);
}

#[test]
fn test_minimal_snapshot_uses_defaults() {
    let json = r#"{ "worksheets": [ { "name": "Extras", "cells": [
        [ { "row": 0, "col": 0 }, { "value": { "String": "hello" } } ]
    ] } ] }"#;

    let wb: Workbook = serde_json::from_str(json).unwrap();
    let sheet = wb.worksheet_by_name("Extras").unwrap();
    assert_eq!(sheet.get_value("A1").unwrap().as_string(), Some("hello"));
    assert_eq!(sheet.cell_style("A1").unwrap(), None);
    assert_eq!(sheet.conditional_format_count(), 0);
}
