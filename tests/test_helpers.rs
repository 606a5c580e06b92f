// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 生成排期工作簿/费率表等磁盘夹具,构造测试配置
// ==========================================

#![allow(dead_code)]

use chrono::NaiveDate;
use dmc_invoicing::config::{AppConfig, RestaurantConfig};
use dmc_invoicing::domain::{CellValue, DateRange};
use dmc_invoicing::writer::invoice_writer::{excel_date, excel_datetime};
use rust_xlsxwriter::{Format, Workbook};
use std::error::Error;
use std::fs;
use std::path::Path;

pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn january_2025() -> DateRange {
    DateRange::new(ymd(2025, 1, 1), ymd(2025, 1, 31))
}

/// 文本单元格
pub fn s(value: &str) -> CellValue {
    CellValue::from(value)
}

/// 数字单元格
pub fn n(value: f64) -> CellValue {
    CellValue::Number(value)
}

/// 日期单元格
pub fn d(y: i32, m: u32, day: u32) -> CellValue {
    CellValue::Date(ymd(y, m, day))
}

/// 空单元格
pub fn e() -> CellValue {
    CellValue::Empty
}

/// 写出一个多工作表的工作簿（每个工作表从 A1 开始）
pub fn write_workbook(path: &Path, sheets: &[(&str, Vec<Vec<CellValue>>)]) -> TestResult {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name)?;
        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                let (r, c) = (row_idx as u32, col_idx as u16);
                match value {
                    CellValue::Empty => {}
                    CellValue::Text(text) => {
                        worksheet.write_string(r, c, text)?;
                    }
                    CellValue::Number(number) => {
                        worksheet.write_number(r, c, *number)?;
                    }
                    CellValue::Bool(flag) => {
                        worksheet.write_boolean(r, c, *flag)?;
                    }
                    CellValue::Date(date) => {
                        worksheet.write_datetime_with_format(r, c, &excel_date(*date)?, &date_format)?;
                    }
                    CellValue::DateTime(dt) => {
                        worksheet.write_datetime_with_format(
                            r,
                            c,
                            &excel_datetime(*dt)?,
                            &date_format,
                        )?;
                    }
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// 排期表头
pub fn schedule_header() -> Vec<CellValue> {
    [
        "TOUR CODE",
        "service date",
        "Service Type",
        "DMC",
        "Adult",
        "Children",
        "Remarks",
    ]
    .iter()
    .map(|h| s(h))
    .collect()
}

/// 排期工作表: 标题行 + 空行 + 表头 + 数据行
pub fn schedule_sheet(title: &str, rows: Vec<Vec<CellValue>>) -> Vec<Vec<CellValue>> {
    let mut sheet = vec![vec![s(title)], vec![], schedule_header()];
    sheet.extend(rows);
    sheet
}

/// 一行排期数据
pub fn booking(
    tour_code: &str,
    date: CellValue,
    service_type: &str,
    vendor: &str,
    adult: CellValue,
    children: CellValue,
    remarks: &str,
) -> Vec<CellValue> {
    vec![
        s(tour_code),
        date,
        s(service_type),
        s(vendor),
        adult,
        children,
        if remarks.is_empty() { e() } else { s(remarks) },
    ]
}

/// 标准费率表: Default(13/15, 儿童 8) + Acme Tours(Lunch 16) + Star Tour(City Tour 12)
pub fn standard_rates() -> Vec<Vec<CellValue>> {
    vec![
        vec![s("DMC"), s("City Tour"), s("Lunch"), s("Child")],
        vec![s("Default"), n(13.0), n(15.0), n(8.0)],
        vec![s("Acme Tours"), e(), n(16.0), e()],
        vec![s("Star Tour"), n(12.0), e(), e()],
    ]
}

pub fn write_rates(base_dir: &Path, rows: Vec<Vec<CellValue>>) -> TestResult {
    write_workbook(&base_dir.join("Rates.xlsx"), &[("Rates", rows)])
}

/// 测试配置: 两个餐厅,无别名
pub fn test_config() -> AppConfig {
    AppConfig {
        restaurants: vec![
            RestaurantConfig {
                name: "Dawat".to_string(),
                address: "Dawat\nParis".to_string(),
                sheet_prefixes: vec!["d".to_string()],
            },
            RestaurantConfig {
                name: "WelcomeIndia".to_string(),
                address: "WelcomeIndia\nParis".to_string(),
                sheet_prefixes: vec!["wel".to_string()],
            },
        ],
        vendor_aliases: Default::default(),
        ignored_duplicates: Vec::new(),
        ..AppConfig::default()
    }
}
