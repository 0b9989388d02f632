mod common;

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tracker_forge::model::{CellValue, Worksheet};
use tracker_forge::{
    AssemblyError, DocumentAssembler, Host, HostLauncher, MergeOutcome, MergePlan, RegionSpec,
    SheetReconciler, SnapshotLauncher,
};

use common::*;

fn tracker_plan() -> MergePlan {
    MergePlan::new(vec![
        RegionSpec::new("Tracker", "A2:H100").unwrap(),
        RegionSpec::new("Totals", "B1").unwrap().data_only(),
    ])
    .unwrap()
}

struct Paths {
    dir: tempfile::TempDir,
    template: PathBuf,
    source: PathBuf,
    output: PathBuf,
}

fn setup(source_sheets: Vec<Worksheet>) -> Paths {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("out")).unwrap();
    let template = write_workbook(
        &dir.path().join("Template.xlsx"),
        vec![template_tracker(), totals(0.0)],
    );
    let source = write_workbook(&dir.path().join("acme.xlsx"), source_sheets);
    let output = dir.path().join("out").join("acme.xlsx");
    Paths {
        dir,
        template,
        source,
        output,
    }
}

fn temp_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with("temp_"))
        .collect()
}

#[test]
fn assembles_and_publishes_under_the_output_name() {
    let mut extras = Worksheet::new("Extras");
    extras.set_cell_value("A1", "Contacts").unwrap();
    extras.set_cell_value("A2", "jane@acme.test").unwrap();
    let mut notes = Worksheet::new("Notes");
    notes.set_cell_value("C3", 3.0).unwrap();

    let paths = setup(vec![
        notes.clone(),
        filled_tracker("Acme"),
        totals(1250.0),
        extras.clone(),
    ]);
    let assembler = DocumentAssembler::new(SnapshotLauncher);
    let outcome = assembler
        .assemble(&paths.source, &paths.template, &paths.output, &tracker_plan())
        .unwrap();

    assert_eq!(outcome.output_path, paths.output);
    assert!(outcome.regions.iter().all(|(_, o)| o.is_merged()));
    assert_eq!(outcome.appended_sheets, vec!["Notes", "Extras"]);

    let wb = read_workbook(&paths.output);
    assert_eq!(wb.sheet_names(), vec!["Tracker", "Totals", "Notes", "Extras"]);
    assert_eq!(wb.worksheet_by_name("Extras"), Some(&extras));
    assert_eq!(wb.worksheet_by_name("Notes"), Some(&notes));
    assert_eq!(
        wb.worksheet_by_name("Totals").unwrap().get_value("B1").unwrap(),
        CellValue::Number(1250.0)
    );
    assert_eq!(
        wb.worksheet_by_name("Tracker").unwrap().get_value("A1").unwrap(),
        CellValue::from("Owner")
    );

    assert!(temp_files(&paths.dir.path().join("out")).is_empty());
    // The template is only ever cloned
    assert_eq!(read_workbook(&paths.template).sheet_names(), vec!["Tracker", "Totals"]);
}

#[test]
fn reconciler_leaves_shared_sheets_alone() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_workbook(
        &dir.path().join("acme.xlsx"),
        vec![totals(99.0), Worksheet::new("Zeta"), Worksheet::new("Alpha")],
    );
    let target = write_workbook(&dir.path().join("temp_1.xlsx"), vec![totals(1.0)]);

    let mut host = SnapshotLauncher.launch().unwrap();
    let (s, t) = (host.open(&source).unwrap(), host.open(&target).unwrap());
    let appended = SheetReconciler::reconcile(&mut host, s, t).unwrap();

    assert_eq!(appended, vec!["Zeta", "Alpha"]);
    let wb = host.workbook(t).unwrap();
    assert_eq!(wb.sheet_names(), vec!["Totals", "Zeta", "Alpha"]);
    assert_eq!(wb.worksheet_by_name("Totals"), Some(&totals(1.0)));

    // Nothing left to append on a second pass
    assert!(SheetReconciler::reconcile(&mut host, s, t).unwrap().is_empty());
}

#[test]
fn reconciler_matches_names_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_workbook(
        &dir.path().join("acme.xlsx"),
        vec![Worksheet::new("TOTALS"), Worksheet::new("Notes")],
    );
    let target = write_workbook(&dir.path().join("temp_1.xlsx"), vec![totals(1.0)]);

    let mut host = SnapshotLauncher.launch().unwrap();
    let (s, t) = (host.open(&source).unwrap(), host.open(&target).unwrap());
    let appended = SheetReconciler::reconcile(&mut host, s, t).unwrap();

    assert_eq!(appended, vec!["TOTALS (2)", "Notes"]);
    let wb = host.workbook(t).unwrap();
    assert_eq!(wb.sheet_names(), vec!["Totals", "TOTALS (2)", "Notes"]);
    assert_eq!(wb.worksheet_by_name("Totals"), Some(&totals(1.0)));
}

#[test]
fn sheet_differing_only_in_case_is_appended_under_a_free_name() {
    let mut shouted = Worksheet::new("TOTALS");
    shouted.set_cell_value("B1", 77.0).unwrap();
    let paths = setup(vec![filled_tracker("Acme"), shouted]);

    let outcome = DocumentAssembler::new(SnapshotLauncher)
        .assemble(&paths.source, &paths.template, &paths.output, &tracker_plan())
        .unwrap();

    assert_eq!(outcome.appended_sheets, vec!["TOTALS (2)"]);
    assert_eq!(outcome.regions[1].1, MergeOutcome::SheetMissingInSource);

    let wb = read_workbook(&paths.output);
    assert_eq!(wb.sheet_names(), vec!["Tracker", "Totals", "TOTALS (2)"]);
    assert_eq!(wb.worksheet_by_name("Totals"), Some(&totals(0.0)));
    assert_eq!(
        wb.worksheet_by_name("TOTALS (2)").unwrap().get_value("B1").unwrap(),
        CellValue::Number(77.0)
    );
}

#[test]
fn missing_sheets_are_recorded_and_the_run_continues() {
    let paths = setup(vec![filled_tracker("Acme"), Worksheet::new("Archive")]);
    let plan = MergePlan::new(vec![
        RegionSpec::new("Budget", "A1:C3").unwrap(),
        RegionSpec::new("Tracker", "A2:H100").unwrap(),
        RegionSpec::new("Archive", "A1").unwrap(),
    ])
    .unwrap();

    let outcome = DocumentAssembler::new(SnapshotLauncher)
        .assemble(&paths.source, &paths.template, &paths.output, &plan)
        .unwrap();

    let outcomes: Vec<&MergeOutcome> = outcome.regions.iter().map(|(_, o)| o).collect();
    assert_eq!(
        outcomes,
        vec![
            &MergeOutcome::SheetMissingInSource,
            &MergeOutcome::Merged,
            &MergeOutcome::SheetMissingInTarget,
        ]
    );
    assert_eq!(outcome.degraded().count(), 2);
    // Sheets are appended only after every region was processed
    assert_eq!(outcome.appended_sheets, vec!["Archive"]);
    assert!(paths.output.exists());
}

#[test]
fn region_failure_does_not_block_later_regions_or_publishing() {
    let paths = setup(vec![filled_tracker("Acme"), totals(5.0)]);
    let launcher = FaultyLauncher::failing(vec![Fault::Read("Tracker".into())]);

    let outcome = DocumentAssembler::new(launcher)
        .assemble(&paths.source, &paths.template, &paths.output, &tracker_plan())
        .unwrap();

    assert!(matches!(outcome.regions[0].1, MergeOutcome::PartialFailure(_)));
    assert_eq!(outcome.regions[1].1, MergeOutcome::Merged);
    let wb = read_workbook(&paths.output);
    assert_eq!(
        wb.worksheet_by_name("Totals").unwrap().get_value("B1").unwrap(),
        CellValue::Number(5.0)
    );
}

#[test]
fn failure_before_publish_keeps_previous_output_and_the_temp_clone() {
    let paths = setup(vec![filled_tracker("Acme"), totals(5.0)]);
    fs::write(&paths.output, "previous run").unwrap();
    let launcher = FaultyLauncher::failing(vec![Fault::Shutdown]);

    let err = DocumentAssembler::new(launcher.clone())
        .assemble(&paths.source, &paths.template, &paths.output, &tracker_plan())
        .unwrap_err();

    assert!(matches!(err, AssemblyError::Session(_)), "{err}");
    assert_eq!(fs::read_to_string(&paths.output).unwrap(), "previous run");

    let temps = temp_files(&paths.dir.path().join("out"));
    assert_eq!(temps.len(), 1);
    let saved = read_workbook(&temps[0]);
    assert_eq!(
        saved.worksheet_by_name("Tracker").unwrap().get_value("A2").unwrap(),
        CellValue::from("Acme")
    );
    assert_eq!(launcher.calls().last(), Some(&Call::Shutdown));
}

#[test]
fn publish_failure_reports_where_the_work_is() {
    let paths = setup(vec![filled_tracker("Acme"), totals(5.0)]);
    // A non-empty directory cannot be removed as a file
    fs::create_dir(&paths.output).unwrap();
    fs::write(paths.output.join("keep"), "").unwrap();

    let err = DocumentAssembler::new(SnapshotLauncher)
        .assemble(&paths.source, &paths.template, &paths.output, &tracker_plan())
        .unwrap_err();

    let temp = err.temp_path().expect("publish error carries the temp path").to_path_buf();
    assert!(matches!(err, AssemblyError::Publish { .. }));
    assert!(err.to_string().contains("processed file remains as"));
    assert_eq!(
        read_workbook(&temp)
            .worksheet_by_name("Tracker")
            .unwrap()
            .get_value("A2")
            .unwrap(),
        CellValue::from("Acme")
    );
}

#[test]
fn session_is_shut_down_when_a_document_cannot_be_opened() {
    let paths = setup(vec![filled_tracker("Acme")]);
    let launcher = FaultyLauncher::failing(vec![Fault::Open("acme.xlsx".into())]);

    let err = DocumentAssembler::new(launcher.clone())
        .assemble(&paths.source, &paths.template, &paths.output, &tracker_plan())
        .unwrap_err();

    assert!(matches!(err, AssemblyError::Open { ref path, .. } if *path == paths.source));
    assert_eq!(launcher.calls().last(), Some(&Call::Shutdown));
    assert!(!paths.output.exists());
}

#[test]
fn reconcile_and_save_failures_abort_the_document() {
    for (fault, check) in [
        (Fault::AppendSheet, "cannot append extra sheets"),
        (Fault::Save, "cannot save"),
    ] {
        let paths = setup(vec![filled_tracker("Acme"), Worksheet::new("Extras")]);
        let err = DocumentAssembler::new(FaultyLauncher::failing(vec![fault]))
            .assemble(&paths.source, &paths.template, &paths.output, &tracker_plan())
            .unwrap_err();
        assert!(err.to_string().starts_with(check), "{err}");
        assert!(!paths.output.exists());
        assert_eq!(temp_files(&paths.dir.path().join("out")).len(), 1);
    }
}

#[test]
fn missing_template_fails_before_starting_a_session() {
    let paths = setup(vec![filled_tracker("Acme")]);
    let launcher = FaultyLauncher::default();
    let err = DocumentAssembler::new(launcher.clone())
        .assemble(
            &paths.source,
            &paths.dir.path().join("missing.xlsx"),
            &paths.output,
            &tracker_plan(),
        )
        .unwrap_err();

    assert!(matches!(err, AssemblyError::Clone { .. }));
    assert!(launcher.calls().is_empty());
}
