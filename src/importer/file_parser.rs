// ==========================================
// DMC 发票系统 - 文件解析器实现
// ==========================================
// 职责: 单表文件 → 行记录（首行表头）,用于费率表
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// ==========================================

use crate::domain::cell::{CellValue, Row};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// calamine 单元格 → CellValue
///
/// 日期时间恰为零点时按纯日期处理
pub fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) => match data.as_datetime() {
            Some(dt) => datetime_cell(dt),
            None => CellValue::Empty,
        },
        Data::DateTimeIso(s) => parse_iso(s),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn datetime_cell(dt: NaiveDateTime) -> CellValue {
    if dt.time() == NaiveTime::MIN {
        CellValue::Date(dt.date())
    } else {
        CellValue::DateTime(dt)
    }
}

fn parse_iso(value: &str) -> CellValue {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return datetime_cell(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return CellValue::Date(date);
    }
    CellValue::Text(value.to_string())
}

/// 检查文件存在并返回小写扩展名
fn checked_extension(path: &Path) -> ImportResult<String> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase())
}

/// 表头 + 数据行 → Row 列表（跳过全空行、空表头列）
fn rows_from_grid<I>(headers: &[String], data_rows: I) -> Vec<Row>
where
    I: IntoIterator<Item = Vec<CellValue>>,
{
    let mut records = Vec::new();
    for data_row in data_rows {
        let mut row = Row::with_capacity(headers.len());
        for (header, value) in headers.iter().zip(data_row) {
            if !header.is_empty() {
                row.insert(header.clone(), value);
            }
        }

        // 跳过完全空白的行
        if row.values().all(|v| v.is_empty()) {
            continue;
        }

        records.push(row);
    }
    records
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_rows(&self, file_path: &Path) -> ImportResult<Vec<Row>> {
        let ext = checked_extension(file_path)?;
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut data_rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            data_rows.push(
                record
                    .iter()
                    .map(|value| {
                        let trimmed = value.trim();
                        if trimmed.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(trimmed.to_string())
                        }
                    })
                    .collect(),
            );
        }

        let records = rows_from_grid(&headers, data_rows);
        debug!(file = %file_path.display(), rows = records.len(), "CSV 解析完成");
        Ok(records)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 读取第一个工作表
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_rows(&self, file_path: &Path) -> ImportResult<Vec<Row>> {
        let ext = checked_extension(file_path)?;
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;
        let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
            return Err(ImportError::ExcelParseError(format!(
                "Excel 文件无工作表: {}",
                file_path.display()
            )));
        };
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::EmptyFile(file_path.display().to_string()))?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell_from_data(cell).to_string().trim().to_string())
            .collect();

        let records = rows_from_grid(
            &headers,
            rows.map(|row| row.iter().map(cell_from_data).collect()),
        );
        debug!(
            file = %file_path.display(),
            sheet = %sheet_name,
            rows = records.len(),
            "Excel 解析完成"
        );
        Ok(records)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<Row>> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_to_rows(path),
            "xlsx" | "xls" => ExcelParser.parse_to_rows(path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn csv_file(lines: &[&str]) -> NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&["DMC,Lunch,Child", "Default,13,8", "Acme Tours,15,"]);

        let records = CsvParser.parse_to_rows(temp_file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("DMC"), Some(&CellValue::from("Default")));
        assert_eq!(records[0].get("Lunch"), Some(&CellValue::from("13")));
        assert_eq!(records[1].get("Child"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_rows(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["DMC,Lunch", "Default,13", ",", "Acme,15"]);

        let records = CsvParser.parse_to_rows(temp_file.path()).unwrap();

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(ext)) if ext == "txt"));
    }

    #[test]
    fn test_excel_parser_reads_first_sheet() {
        let temp_file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "DMC").unwrap();
        sheet.write_string(0, 1, "City Tour").unwrap();
        sheet.write_string(1, 0, "Default").unwrap();
        sheet.write_number(1, 1, 13.0).unwrap();
        workbook.save(temp_file.path()).unwrap();

        let records = UniversalFileParser.parse(temp_file.path()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("City Tour"), Some(&CellValue::Number(13.0)));
    }

    #[test]
    fn test_cell_from_data_conversions() {
        assert_eq!(cell_from_data(&Data::Empty), CellValue::Empty);
        assert_eq!(cell_from_data(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(
            cell_from_data(&Data::DateTimeIso("2025-01-20".to_string())),
            CellValue::Date(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap())
        );
    }
}
