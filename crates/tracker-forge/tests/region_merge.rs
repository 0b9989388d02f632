mod common;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tracker_forge::model::{
    CellRange, CellValue, CfRuleType, ConditionalFormatRule, Style, Worksheet,
};
use tracker_forge::{DocumentId, Host, HostLauncher, MergeOutcome, PasteLayer, RegionMerger, RegionSpec};

use common::*;

struct Fixture {
    _dir: TempDir,
    launcher: FaultyLauncher,
    host: FaultyHost,
    source: DocumentId,
    target: DocumentId,
}

impl Fixture {
    fn new(faults: Vec<Fault>, source: Vec<Worksheet>, target: Vec<Worksheet>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source_path = write_workbook(&dir.path().join("acme.xlsx"), source);
        let target_path = write_workbook(&dir.path().join("temp_0.xlsx"), target);

        let launcher = FaultyLauncher::failing(faults);
        let mut host = launcher.launch().unwrap();
        let source = host.open(&source_path).unwrap();
        let target = host.open(&target_path).unwrap();
        Self {
            _dir: dir,
            launcher,
            host,
            source,
            target,
        }
    }

    fn merge(&mut self, spec: &RegionSpec) -> MergeOutcome {
        RegionMerger::merge(&mut self.host, self.source, self.target, spec)
    }

    fn target_sheet(&self, name: &str) -> &Worksheet {
        self.host
            .inner
            .workbook(self.target)
            .unwrap()
            .worksheet_by_name(name)
            .unwrap()
    }
}

fn tracker_region() -> RegionSpec {
    RegionSpec::new("Tracker", "A2:H100").unwrap()
}

fn rules_in(ws: &Worksheet, range: &str) -> Vec<ConditionalFormatRule> {
    ws.conditional_formats_in(&cells(range))
        .into_iter()
        .cloned()
        .collect()
}

#[test]
fn values_are_identical_for_every_flag_combination() {
    let mut results = Vec::new();
    for (formatting, conditional) in [(false, false), (true, false), (false, true), (true, true)] {
        let mut fx = Fixture::new(vec![], vec![filled_tracker("Acme")], vec![template_tracker()]);
        let spec = tracker_region()
            .with_formatting(formatting)
            .with_conditional_formatting(conditional);

        assert_eq!(fx.merge(&spec), MergeOutcome::Merged);
        results.push(fx.target_sheet("Tracker").range_values(&cells("A1:H100")));
    }

    assert_eq!(results[0][1][0], CellValue::from("Acme"));
    assert_eq!(results[0][1][1], CellValue::Number(12.5));
    assert_eq!(results[0][0][0], CellValue::from("Owner"));
    for other in &results[1..] {
        assert_eq!(other, &results[0]);
    }
}

#[test]
fn data_only_region_leaves_formatting_and_rules_alone() {
    let mut fx = Fixture::new(vec![], vec![filled_tracker("Acme")], vec![template_tracker()]);
    let before = rules_in(fx.target_sheet("Tracker"), "A2:H100");

    assert_eq!(fx.merge(&tracker_region().data_only()), MergeOutcome::Merged);

    let ws = fx.target_sheet("Tracker");
    assert_eq!(ws.get_value("B2").unwrap(), CellValue::Number(12.5));
    assert_eq!(ws.cell_style("A2").unwrap(), None);
    assert_eq!(
        ws.cell_style("B2").unwrap(),
        Some(&Style::new().number_format("0.00"))
    );
    assert_eq!(rules_in(ws, "A2:H100"), before);
    assert!(fx
        .launcher
        .calls()
        .iter()
        .all(|c| !matches!(c, Call::Paste(..) | Call::Delete(..))));
}

#[test]
fn source_without_rules_does_not_clear_target_rules() {
    let mut source = filled_tracker("Acme");
    source.detach_conditional_format(&cells("A1:Z100"), 0);
    assert_eq!(source.conditional_format_count(), 0);

    let mut fx = Fixture::new(vec![], vec![source], vec![template_tracker()]);
    let before = rules_in(fx.target_sheet("Tracker"), "A2:H100");
    assert_eq!(before.len(), 1);

    assert_eq!(fx.merge(&tracker_region()), MergeOutcome::Merged);
    assert_eq!(rules_in(fx.target_sheet("Tracker"), "A2:H100"), before);
    assert!(!fx
        .launcher
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Delete(..))));
}

#[test]
fn region_receives_values_formatting_and_exactly_the_source_rules() {
    let mut source = Worksheet::new("Sheet1");
    for (addr, value) in [("A1", 1.0), ("B1", 2.0), ("A2", 3.0), ("B3", 6.0)] {
        source.set_cell_value(addr, value).unwrap();
    }
    let highlight = Style::new().fill_color(tracker_forge::model::Color::rgb(255, 235, 156));
    source.set_cell_style("B3", &highlight).unwrap();
    source.add_conditional_format(
        ConditionalFormatRule::expression("=$A1>2").with_range(cells("A1:A3")),
    );
    source.add_conditional_format(
        ConditionalFormatRule::cell_is_greater_than("4")
            .with_range(cells("A1:B10"))
            .with_priority(2),
    );

    let mut target = Worksheet::new("Sheet1");
    target.set_cell_value("A1", "stale").unwrap();
    let unrelated = ConditionalFormatRule::contains_text("overdue").with_range(cells("D10:D20"));
    target.add_conditional_format(unrelated.clone());

    let mut fx = Fixture::new(vec![], vec![source], vec![target]);
    let spec = RegionSpec::new("Sheet1", "A1:B3").unwrap();
    assert_eq!(fx.merge(&spec), MergeOutcome::Merged);

    let ws = fx.target_sheet("Sheet1");
    assert_eq!(
        ws.range_values(&cells("A1:B3")),
        vec![
            vec![CellValue::Number(1.0), CellValue::Number(2.0)],
            vec![CellValue::Number(3.0), CellValue::Empty],
            vec![CellValue::Empty, CellValue::Number(6.0)],
        ]
    );
    assert_eq!(ws.cell_style("B3").unwrap(), Some(&highlight));

    let pasted = rules_in(ws, "A1:B3");
    assert_eq!(pasted.len(), 2);
    assert!(matches!(pasted[0].rule_type, CfRuleType::Expression { .. }));
    assert_eq!(pasted[0].ranges, vec![cells("A1:A3")]);
    assert!(matches!(pasted[1].rule_type, CfRuleType::CellIs { .. }));
    assert_eq!(pasted[1].ranges, vec![cells("A1:B3")]);

    assert_eq!(ws.conditional_format_count(), 3);
    assert_eq!(ws.conditional_formats()[0], unrelated);
}

#[test]
fn formatting_failure_keeps_values_and_rules() {
    let mut fx = Fixture::new(
        vec![Fault::Paste("Tracker".into(), PasteLayer::Formats)],
        vec![filled_tracker("Acme")],
        vec![template_tracker()],
    );

    let outcome = fx.merge(&tracker_region());
    let MergeOutcome::PartialFailure(reason) = outcome else {
        panic!("expected partial failure, got {outcome:?}");
    };
    assert!(reason.contains("formatting transfer failed"), "{reason}");

    let ws = fx.target_sheet("Tracker");
    assert_eq!(ws.get_value("A2").unwrap(), CellValue::from("Acme"));
    assert_eq!(ws.cell_style("A2").unwrap(), None);
    let rules = rules_in(ws, "A2:H100");
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].ranges, vec![cells("B2:B100")]);
}

#[test]
fn values_failure_does_not_stop_other_layers() {
    let mut fx = Fixture::new(
        vec![Fault::Read("Tracker".into())],
        vec![filled_tracker("Acme")],
        vec![template_tracker()],
    );

    let outcome = fx.merge(&tracker_region());
    assert!(
        matches!(&outcome, MergeOutcome::PartialFailure(r) if r.starts_with("values transfer failed")),
        "{outcome:?}"
    );
    let ws = fx.target_sheet("Tracker");
    assert_eq!(ws.get_value("A2").unwrap(), CellValue::Empty);
    assert!(ws.cell_style("A2").unwrap().unwrap().font.bold);
}

#[test]
fn failed_conditional_paste_after_clear_is_reported() {
    let mut fx = Fixture::new(
        vec![Fault::Paste("Tracker".into(), PasteLayer::ConditionalFormats)],
        vec![filled_tracker("Acme")],
        vec![template_tracker()],
    );

    let outcome = fx.merge(&tracker_region());
    assert!(
        matches!(&outcome, MergeOutcome::PartialFailure(r) if r.contains("cleared from the target")),
        "{outcome:?}"
    );
    assert!(rules_in(fx.target_sheet("Tracker"), "A2:H100").is_empty());
}

#[test]
fn target_rules_are_deleted_last_to_first() {
    let mut target = template_tracker();
    target.add_conditional_format(
        ConditionalFormatRule::expression("=$H2=\"done\"").with_range(cells("A2:H100")),
    );
    let mut fx = Fixture::new(vec![], vec![filled_tracker("Acme")], vec![target]);

    assert_eq!(fx.merge(&tracker_region()), MergeOutcome::Merged);
    let deletes: Vec<Call> = fx
        .launcher
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Delete(..)))
        .collect();
    assert_eq!(
        deletes,
        vec![
            Call::Delete("Tracker!A2:H100".into(), 1),
            Call::Delete("Tracker!A2:H100".into(), 0),
        ]
    );
}

#[test]
fn unresolvable_region_is_skipped_entirely() {
    let mut fx = Fixture::new(
        vec![Fault::Resolve("Tracker".into())],
        vec![filled_tracker("Acme")],
        vec![template_tracker()],
    );

    let outcome = fx.merge(&tracker_region());
    assert!(
        matches!(&outcome, MergeOutcome::PartialFailure(r) if r.contains("cannot resolve range on source sheet")),
        "{outcome:?}"
    );
    assert_eq!(fx.target_sheet("Tracker").get_value("A2").unwrap(), CellValue::Empty);
    assert!(!fx
        .launcher
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Copy(_) | Call::Paste(..))));
}

#[test]
fn transfer_buffer_is_cleared_after_every_region() {
    let mut fx = Fixture::new(vec![], vec![filled_tracker("Acme")], vec![template_tracker()]);
    fx.merge(&tracker_region());
    assert!(!fx.host.inner.has_transfer_buffer());
    assert_eq!(fx.launcher.calls().last(), Some(&Call::ClearBuffer));

    let mut fx = Fixture::new(
        vec![Fault::Paste("Tracker".into(), PasteLayer::Formats)],
        vec![filled_tracker("Acme")],
        vec![template_tracker()],
    );
    fx.merge(&tracker_region());
    assert!(!fx.host.inner.has_transfer_buffer());
}

#[test]
fn failing_to_clear_the_buffer_is_not_an_error() {
    let mut fx = Fixture::new(
        vec![Fault::ClearBuffer],
        vec![filled_tracker("Acme")],
        vec![template_tracker()],
    );
    assert_eq!(fx.merge(&tracker_region()), MergeOutcome::Merged);
}

#[test]
fn single_cell_region() {
    let mut fx = Fixture::new(vec![], vec![totals(1250.0)], vec![totals(0.0)]);
    let spec = RegionSpec::new("Totals", "B1").unwrap().data_only();
    assert_eq!(fx.merge(&spec), MergeOutcome::Merged);
    assert_eq!(
        fx.target_sheet("Totals").range_values(&CellRange::parse("B1").unwrap()),
        vec![vec![CellValue::Number(1250.0)]]
    );
}
