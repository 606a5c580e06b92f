// ==========================================
// DMC 发票系统 - 排期表读取器
// ==========================================
// 职责: 按账期定位排期文件 → 每个餐厅定位工作表 → 表头识别 → 行记录
// 目录: <base_dir>/<月份全称|月份缩写>/<日>-<月>.xlsx
// 协作方异常: 工作表缺失 / 工作表名疑似拼写错误（汇入无效报告）
// ==========================================

use crate::config::RestaurantConfig;
use crate::domain::booking::columns;
use crate::domain::cell::{CellValue, Row};
use crate::domain::report::InvalidGroup;
use crate::domain::types::DateRange;
use crate::engine::canonicalizer::title_case;
use crate::engine::events::ProgressReporter;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::cell_from_data;
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// 表头搜索的最大行数
pub const MAX_HEADER_ROWS: usize = 50;

/// 读取的最大列数
pub const MAX_COLUMNS: usize = 25;

/// 表头行首列标记（小写比较）
pub const HEADER_MARKER: &str = "tour code";

/// 工作表缺失的无效原因
pub const SHEET_NOT_FOUND_REASON: &str = "Restaurant sheet not found";

/// 工作表名疑似拼写错误的无效原因
pub const SHEET_TYPO_REASON: &str = "Sheet name looks like a typo";

// ==========================================
// 目录与文件发现
// ==========================================

/// 账期涉及的月份目录名（全称 + 缩写,各出现一次,按账期顺序）
pub fn schedule_directories(range: &DateRange) -> Vec<String> {
    let mut directories: Vec<String> = Vec::new();
    let mut current = NaiveDate::from_ymd_opt(range.from.year(), range.from.month(), 1);

    while let Some(month_start) = current {
        if month_start > range.to {
            break;
        }
        for name in [
            month_start.format("%B").to_string(),
            month_start.format("%b").to_string(),
        ] {
            if !directories.contains(&name) {
                directories.push(name);
            }
        }
        current = month_start.checked_add_months(Months::new(1));
    }
    directories
}

/// 文件名是否以日数字开头（"-" 视为空白）
fn starts_with_day(file_name: &str) -> bool {
    file_name
        .replace('-', " ")
        .split_whitespace()
        .next()
        .is_some_and(|token| token.parse::<u32>().is_ok())
}

/// 是否为 Excel 工作簿
fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xls"))
}

/// 列出账期内的排期文件（目录不存在时跳过,结果排序）
pub fn list_schedule_files(
    base_dir: &Path,
    range: &DateRange,
    reporter: &ProgressReporter,
) -> ImportResult<Vec<PathBuf>> {
    let directories = schedule_directories(range);
    reporter.report(format!(
        "Searching for directories: {}",
        directories.join(", ")
    ));

    let mut files = Vec::new();
    for directory in &directories {
        let dir_path = base_dir.join(directory);
        if !dir_path.is_dir() {
            debug!(dir = %dir_path.display(), "月份目录不存在,跳过");
            continue;
        }

        for entry in fs::read_dir(&dir_path)? {
            let path = entry?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if path.is_file() && is_workbook(&path) && starts_with_day(file_name) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

// ==========================================
// 协作方异常记录
// ==========================================

/// 排期文件中找不到餐厅工作表
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetNotFound {
    pub file_name: String,
    pub restaurant: String,
}

/// 工作表名与餐厅名不一致,按前缀匹配使用
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SheetTypo {
    pub file_name: String,
    pub restaurant: String,
    pub sheet_name: String,
}

/// 单个文件的读取结果
#[derive(Debug, Clone, Default)]
pub struct FileContents {
    pub rows: Vec<Row>,
    pub not_found: Vec<SheetNotFound>,
    pub typos: Vec<SheetTypo>,
}

// ==========================================
// ScheduleData - 全部排期数据
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ScheduleData {
    pub rows: Vec<Row>,
    pub not_found: Vec<SheetNotFound>,
    pub typos: Vec<SheetTypo>,
    pub files_read: usize,
}

impl ScheduleData {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 某餐厅的行
    pub fn rows_for(&self, restaurant: &str) -> Vec<Row> {
        self.rows
            .iter()
            .filter(|row| {
                row.get(columns::RESTAURANT)
                    .and_then(|v| v.as_text())
                    .is_some_and(|name| name == restaurant)
            })
            .cloned()
            .collect()
    }

    /// 某餐厅的协作方无效分组（工作表缺失在前,拼写疑似在后）
    pub fn collaborator_groups(&self, restaurant: &str) -> Vec<InvalidGroup> {
        let not_found_rows: Vec<Row> = self
            .not_found
            .iter()
            .filter(|entry| entry.restaurant == restaurant)
            .map(|entry| {
                let mut row = Row::new();
                row.insert(columns::FILE_NAME.to_string(), CellValue::from(entry.file_name.as_str()));
                row.insert(columns::RESTAURANT.to_string(), CellValue::from(entry.restaurant.as_str()));
                row
            })
            .collect();

        let typo_rows: Vec<Row> = self
            .typos
            .iter()
            .filter(|entry| entry.restaurant == restaurant)
            .map(|entry| {
                let mut row = Row::new();
                row.insert(columns::FILE_NAME.to_string(), CellValue::from(entry.file_name.as_str()));
                row.insert(columns::RESTAURANT.to_string(), CellValue::from(entry.restaurant.as_str()));
                row.insert(columns::SHEET_NAME.to_string(), CellValue::from(entry.sheet_name.as_str()));
                row
            })
            .collect();

        [
            InvalidGroup::from_rows(SHEET_NOT_FOUND_REASON, not_found_rows),
            InvalidGroup::from_rows(SHEET_TYPO_REASON, typo_rows),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// ==========================================
// 工作表内容解析
// ==========================================

/// 解析工作表: 定位表头行,读取其后的数据行
///
/// # 返回
/// - None: 前 MAX_HEADER_ROWS 行内没有表头,或表头后无数据
pub fn read_sheet(range: &Range<Data>) -> Option<Vec<Row>> {
    // Range 从首个非空单元格开始;A 列全空时不可能有表头
    let (start_row, start_col) = range.start()?;
    if start_col != 0 {
        return None;
    }

    let mut rows = range.rows();
    let mut header: Option<Vec<String>> = None;
    let mut row_idx = start_row as usize;
    for row in rows.by_ref() {
        if row_idx >= MAX_HEADER_ROWS {
            break;
        }
        row_idx += 1;

        let is_header = row
            .first()
            .map(cell_from_data)
            .and_then(|v| v.as_text())
            .is_some_and(|text| text.to_lowercase() == HEADER_MARKER);
        if is_header {
            let mut cells: Vec<CellValue> =
                row.iter().take(MAX_COLUMNS).map(cell_from_data).collect();
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            header = Some(
                cells
                    .iter()
                    .map(|c| title_case(&c.as_text().unwrap_or_default()))
                    .collect(),
            );
            break;
        }
    }
    let header = header?;

    let mut data: Vec<Row> = Vec::new();
    for row in rows {
        let values: Vec<CellValue> = row.iter().take(header.len()).map(cell_from_data).collect();
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        let mut record = Row::with_capacity(header.len());
        for (column, value) in header.iter().zip(values) {
            if !column.is_empty() && !record.contains_key(column) {
                record.insert(column.clone(), value);
            }
        }
        data.push(record);
    }

    if data.is_empty() {
        return None;
    }

    // 全列为空的列剔除
    let keep: Vec<String> = header
        .iter()
        .filter(|column| {
            data.iter()
                .any(|row| row.get(column.as_str()).is_some_and(|v| !v.is_empty()))
        })
        .cloned()
        .collect();
    for row in &mut data {
        row.retain(|column, _| keep.contains(column));
    }

    Some(data)
}

/// 去重指纹（列名排序后的键值对）
fn row_fingerprint(row: &Row) -> String {
    let mut pairs: Vec<(&String, &CellValue)> = row.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    format!("{:?}", pairs)
}

// ==========================================
// ScheduleReader - 排期表读取器
// ==========================================
pub struct ScheduleReader<'a> {
    restaurants: &'a [RestaurantConfig],
    reporter: ProgressReporter,
}

impl<'a> ScheduleReader<'a> {
    pub fn new(restaurants: &'a [RestaurantConfig], reporter: ProgressReporter) -> Self {
        Self {
            restaurants,
            reporter,
        }
    }

    /// 为餐厅选择工作表
    ///
    /// # 返回
    /// - (工作表名, 是否为前缀匹配)
    fn select_sheet(
        restaurant: &RestaurantConfig,
        sheet_names: &[String],
    ) -> Option<(String, bool)> {
        if sheet_names.iter().any(|name| name == &restaurant.name) {
            return Some((restaurant.name.clone(), false));
        }
        sheet_names
            .iter()
            .find(|name| {
                let lowered = name.to_lowercase();
                restaurant
                    .sheet_prefixes
                    .iter()
                    .any(|prefix| lowered.starts_with(&prefix.to_lowercase()))
            })
            .map(|name| (name.clone(), true))
    }

    /// 读取单个排期文件
    #[instrument(skip(self), fields(file = %path.display()))]
    pub fn read_file(&self, path: &Path) -> ImportResult<FileContents> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut workbook = open_workbook_auto(path)?;
        let sheet_names = workbook.sheet_names();

        let mut contents = FileContents::default();
        for restaurant in self.restaurants {
            let Some((sheet_name, is_typo)) = Self::select_sheet(restaurant, &sheet_names) else {
                contents.not_found.push(SheetNotFound {
                    file_name: file_name.clone(),
                    restaurant: restaurant.name.clone(),
                });
                continue;
            };
            if is_typo {
                debug!(restaurant = %restaurant.name, sheet = %sheet_name, "工作表名前缀匹配");
                contents.typos.push(SheetTypo {
                    file_name: file_name.clone(),
                    restaurant: restaurant.name.clone(),
                    sheet_name: sheet_name.clone(),
                });
            }

            let range = workbook.worksheet_range(&sheet_name)?;
            let Some(rows) = read_sheet(&range) else {
                continue;
            };

            for row in rows {
                let mut tagged = Row::with_capacity(row.len() + 2);
                tagged.insert(columns::FILE_NAME.to_string(), CellValue::from(file_name.as_str()));
                for (column, value) in row {
                    if column != columns::FILE_NAME && column != columns::RESTAURANT {
                        tagged.insert(column, value);
                    }
                }
                tagged.insert(
                    columns::RESTAURANT.to_string(),
                    CellValue::from(restaurant.name.as_str()),
                );
                contents.rows.push(tagged);
            }
        }

        debug!(
            rows = contents.rows.len(),
            not_found = contents.not_found.len(),
            typos = contents.typos.len(),
            "排期文件读取完成"
        );
        Ok(contents)
    }

    /// 读取账期内全部排期文件
    ///
    /// 单个文件读取失败不中断,按无数据处理
    #[instrument(skip(self, base_dir), fields(range = %range))]
    pub fn read_all(&self, base_dir: &Path, range: &DateRange) -> ImportResult<ScheduleData> {
        let files = list_schedule_files(base_dir, range, &self.reporter)?;
        self.reporter.report(format!("Found {} files", files.len()));

        let mut data = ScheduleData::default();
        let mut seen_rows: HashSet<String> = HashSet::new();
        let mut seen_not_found: HashSet<SheetNotFound> = HashSet::new();
        let mut seen_typos: HashSet<SheetTypo> = HashSet::new();

        for file in &files {
            let contents = match self.read_file(file) {
                Ok(contents) => contents,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "排期文件读取失败");
                    FileContents::default()
                }
            };
            data.files_read += 1;

            for entry in contents.not_found {
                if seen_not_found.insert(entry.clone()) {
                    data.not_found.push(entry);
                }
            }
            for entry in contents.typos {
                if seen_typos.insert(entry.clone()) {
                    data.typos.push(entry);
                }
            }

            if contents.rows.is_empty() {
                self.reporter
                    .report(format!("No data found for {}", file.display()));
                continue;
            }
            for row in contents.rows {
                if seen_rows.insert(row_fingerprint(&row)) {
                    data.rows.push(row);
                }
            }
        }

        if data.rows.is_empty() {
            self.reporter.report("No data found for any file");
        }
        info!(
            files = files.len(),
            rows = data.rows.len(),
            not_found = data.not_found.len(),
            typos = data.typos.len(),
            "排期数据读取完成"
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_schedule_directories_single_month() {
        let range = DateRange::new(ymd(2025, 1, 1), ymd(2025, 1, 31));
        assert_eq!(schedule_directories(&range), vec!["January", "Jan"]);
    }

    #[test]
    fn test_schedule_directories_span_months() {
        let range = DateRange::new(ymd(2025, 4, 20), ymd(2025, 6, 2));
        assert_eq!(
            schedule_directories(&range),
            vec!["April", "Apr", "May", "June", "Jun"]
        );
    }

    #[test]
    fn test_starts_with_day() {
        assert!(starts_with_day("1-Jan.xlsx"));
        assert!(starts_with_day("15 January.xlsx"));
        assert!(!starts_with_day("Rates.xlsx"));
        assert!(!starts_with_day("1.xlsx"));
    }

    #[test]
    fn test_select_sheet() {
        let restaurant = RestaurantConfig {
            name: "Dawat".to_string(),
            address: String::new(),
            sheet_prefixes: vec!["d".to_string()],
        };
        let exact = vec!["Other".to_string(), "Dawat".to_string()];
        assert_eq!(
            ScheduleReader::select_sheet(&restaurant, &exact),
            Some(("Dawat".to_string(), false))
        );

        let typo = vec!["Welcome".to_string(), "dawaat".to_string()];
        assert_eq!(
            ScheduleReader::select_sheet(&restaurant, &typo),
            Some(("dawaat".to_string(), true))
        );

        let missing = vec!["Welcome".to_string()];
        assert_eq!(ScheduleReader::select_sheet(&restaurant, &missing), None);
    }

    #[test]
    fn test_collaborator_groups() {
        let data = ScheduleData {
            not_found: vec![SheetNotFound {
                file_name: "1-Jan.xlsx".to_string(),
                restaurant: "Dawat".to_string(),
            }],
            typos: vec![SheetTypo {
                file_name: "2-Jan.xlsx".to_string(),
                restaurant: "WelcomeIndia".to_string(),
                sheet_name: "welcom".to_string(),
            }],
            ..Default::default()
        };

        let dawat = data.collaborator_groups("Dawat");
        assert_eq!(dawat.len(), 1);
        assert_eq!(dawat[0].reason, SHEET_NOT_FOUND_REASON);
        assert_eq!(dawat[0].table.columns, vec!["Reason", "File Name", "Restaurant"]);

        let welcome = data.collaborator_groups("WelcomeIndia");
        assert_eq!(welcome.len(), 1);
        assert_eq!(
            welcome[0].table.columns,
            vec!["Reason", "File Name", "Restaurant", "Sheet Name"]
        );
    }

    #[test]
    fn test_row_fingerprint_ignores_column_order() {
        let mut a = Row::new();
        a.insert("Tour Code".to_string(), CellValue::from("T1"));
        a.insert("Adult".to_string(), CellValue::Number(2.0));
        let mut b = Row::new();
        b.insert("Adult".to_string(), CellValue::Number(2.0));
        b.insert("Tour Code".to_string(), CellValue::from("T1"));

        assert_eq!(row_fingerprint(&a), row_fingerprint(&b));
    }
}
