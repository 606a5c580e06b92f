// ==========================================
// ScheduleReader 集成测试
// ==========================================
// 测试目标: 月份目录扫描、表头定位、工作表选择、去重
// ==========================================

mod test_helpers;

use dmc_invoicing::domain::CellValue;
use dmc_invoicing::engine::{CollectingProgressSink, ProgressReporter};
use dmc_invoicing::importer::schedule_reader::ScheduleReader;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;
use test_helpers::*;

fn one_booking(code: &str, day: u32) -> Vec<CellValue> {
    booking(code, d(2025, 1, day), "City Tour", "Star Tour", n(2.0), e(), "")
}

#[test]
fn test_reads_rows_below_title_block() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("January").join("3-January.xlsx");
    write_workbook(
        &path,
        &[("Dawat", schedule_sheet("DAWAT", vec![one_booking("T1", 3), one_booking("T2", 4)]))],
    )
    .unwrap();

    let config = test_config();
    let reader = ScheduleReader::new(&config.restaurants, ProgressReporter::none());
    let data = reader.read_all(dir.path(), &january_2025()).unwrap();

    assert_eq!(data.files_read, 1);
    let rows = data.rows_for("Dawat");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("Tour Code"), Some(&s("T1")));
    assert_eq!(rows[0].get("File Name"), Some(&s("3-January.xlsx")));
    assert_eq!(rows[0].get("Restaurant"), Some(&s("Dawat")));
    assert_eq!(rows[0].get("Service Date"), Some(&d(2025, 1, 3)));
    // Remarks 列全空 → 剔除
    assert!(rows[0].get("Remarks").is_none());
}

#[test]
fn test_data_rows_beyond_header_window_are_kept() {
    let dir = tempdir().unwrap();
    let bookings: Vec<Vec<CellValue>> = (0..60)
        .map(|i| one_booking(&format!("T{}", i), 1 + (i % 28) as u32))
        .collect();
    write_workbook(
        &dir.path().join("Jan").join("1 Jan.xlsx"),
        &[("Dawat", schedule_sheet("DAWAT", bookings))],
    )
    .unwrap();

    let config = test_config();
    let reader = ScheduleReader::new(&config.restaurants, ProgressReporter::none());
    let data = reader.read_all(dir.path(), &january_2025()).unwrap();

    assert_eq!(data.rows_for("Dawat").len(), 60);
}

#[test]
fn test_header_too_far_down_yields_no_data() {
    let dir = tempdir().unwrap();
    let mut sheet: Vec<Vec<CellValue>> = vec![vec![s("DAWAT")]];
    sheet.extend((0..60).map(|i| vec![s(&format!("note {}", i))]));
    sheet.push(schedule_header());
    sheet.push(one_booking("T1", 5));
    write_workbook(&dir.path().join("January").join("5-January.xlsx"), &[("Dawat", sheet)]).unwrap();

    let sink = CollectingProgressSink::new();
    let config = test_config();
    let reader = ScheduleReader::new(
        &config.restaurants,
        ProgressReporter::with_sink(Arc::new(sink.clone())),
    );
    let data = reader.read_all(dir.path(), &january_2025()).unwrap();

    assert!(data.is_empty());
    assert!(sink.contains("No data found for"));
    assert!(sink.contains("No data found for any file"));
}

#[test]
fn test_identical_rows_within_file_are_deduplicated() {
    let dir = tempdir().unwrap();
    write_workbook(
        &dir.path().join("January").join("7-January.xlsx"),
        &[(
            "Dawat",
            schedule_sheet("DAWAT", vec![one_booking("T1", 7), one_booking("T1", 7)]),
        )],
    )
    .unwrap();

    let config = test_config();
    let reader = ScheduleReader::new(&config.restaurants, ProgressReporter::none());
    let data = reader.read_all(dir.path(), &january_2025()).unwrap();

    assert_eq!(data.rows_for("Dawat").len(), 1);
}

#[test]
fn test_skips_files_without_day_prefix_and_unreadable_files() {
    let dir = tempdir().unwrap();
    let month = dir.path().join("January");
    write_workbook(
        &month.join("notes.xlsx"),
        &[("Dawat", schedule_sheet("DAWAT", vec![one_booking("X", 1)]))],
    )
    .unwrap();
    fs::write(month.join("9-January.xlsx"), b"not a workbook").unwrap();
    write_workbook(
        &month.join("10-January.xlsx"),
        &[("Dawat", schedule_sheet("DAWAT", vec![one_booking("T10", 10)]))],
    )
    .unwrap();

    let sink = CollectingProgressSink::new();
    let config = test_config();
    let reader = ScheduleReader::new(
        &config.restaurants,
        ProgressReporter::with_sink(Arc::new(sink.clone())),
    );
    let data = reader.read_all(dir.path(), &january_2025()).unwrap();

    assert!(sink.contains("Found 2 files"));
    assert_eq!(data.files_read, 2);
    let rows = data.rows_for("Dawat");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("Tour Code"), Some(&s("T10")));
}

#[test]
fn test_sheet_typo_and_missing_sheet_recorded_once_per_file() {
    let dir = tempdir().unwrap();
    write_workbook(
        &dir.path().join("January").join("12-January.xlsx"),
        &[("dawaat", schedule_sheet("DAWAT", vec![one_booking("T1", 12)]))],
    )
    .unwrap();

    let config = test_config();
    let reader = ScheduleReader::new(&config.restaurants, ProgressReporter::none());
    let data = reader.read_all(dir.path(), &january_2025()).unwrap();

    assert_eq!(data.typos.len(), 1);
    assert_eq!(data.typos[0].sheet_name, "dawaat");
    assert_eq!(data.typos[0].restaurant, "Dawat");
    // 前缀匹配的工作表照常读取
    assert_eq!(data.rows_for("Dawat").len(), 1);

    assert_eq!(data.not_found.len(), 1);
    assert_eq!(data.not_found[0].restaurant, "WelcomeIndia");
    assert_eq!(data.not_found[0].file_name, "12-January.xlsx");
}
