// ==========================================
// DMC 发票系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 服务日期解析 / 人数与单价解析
// ==========================================

use crate::domain::cell::CellValue;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// 文本日期支持的格式（按顺序尝试）
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%Y%m%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// 带时间部分的文本日期格式
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

pub struct DataCleaner;

impl DataCleaner {
    /// TRIM
    pub fn clean_text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    /// 解析服务日期
    ///
    /// # 规则
    /// - 日期/日期时间单元格: 直接取日期部分
    /// - 文本: 依次尝试常见日期格式（含时间后缀）
    /// - 其他（数字、布尔、空）: 无法解析
    pub fn parse_service_date(&self, value: &CellValue) -> Option<NaiveDate> {
        match value {
            CellValue::Date(date) => Some(*date),
            CellValue::DateTime(dt) => Some(dt.date()),
            CellValue::Text(text) => self.parse_date_text(text),
            _ => None,
        }
    }

    /// 解析文本日期
    pub fn parse_date_text(&self, text: &str) -> Option<NaiveDate> {
        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            return None;
        }

        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
            .or_else(|| {
                DATETIME_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(&cleaned, fmt).ok())
                    .map(|dt| dt.date())
            })
    }

    /// 解析数量/单价（数字或数值文本;其他视为缺失）
    pub fn parse_decimal(&self, value: &CellValue) -> Option<Decimal> {
        if value.is_empty() {
            return None;
        }
        value.as_decimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_clean_text_basic() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  hello  "), "hello");
    }

    #[test]
    fn test_parse_service_date_native() {
        let cleaner = DataCleaner;
        let date = ymd(2025, 1, 20);
        assert_eq!(cleaner.parse_service_date(&CellValue::Date(date)), Some(date));

        let dt = date.and_hms_opt(19, 30, 0).unwrap();
        assert_eq!(cleaner.parse_service_date(&CellValue::DateTime(dt)), Some(date));
    }

    #[test]
    fn test_parse_service_date_text_formats() {
        let cleaner = DataCleaner;
        let expected = ymd(2025, 1, 20);
        for text in [
            "2025-01-20",
            "20/01/2025",
            "20-01-2025",
            "20.01.2025",
            "2025/01/20",
            "20250120",
            "20 Jan 2025",
            "20 January 2025",
            "Jan 20 2025",
            "2025-01-20 12:00:00",
            " 20/01/2025  19:30 ",
        ] {
            assert_eq!(
                cleaner.parse_service_date(&CellValue::from(text)),
                Some(expected),
                "text={:?}",
                text
            );
        }
    }

    #[test]
    fn test_parse_service_date_unparseable() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_service_date(&CellValue::from("tomorrow")), None);
        assert_eq!(cleaner.parse_service_date(&CellValue::from("31/02/2025")), None);
        assert_eq!(cleaner.parse_service_date(&CellValue::Number(45678.0)), None);
        assert_eq!(cleaner.parse_service_date(&CellValue::Empty), None);
    }

    #[test]
    fn test_parse_decimal() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_decimal(&CellValue::Number(3.0)), Some(Decimal::from(3)));
        assert_eq!(cleaner.parse_decimal(&CellValue::from(" 2 ")), Some(Decimal::from(2)));
        assert_eq!(cleaner.parse_decimal(&CellValue::from("two")), None);
        assert_eq!(cleaner.parse_decimal(&CellValue::from("  ")), None);
        assert_eq!(cleaner.parse_decimal(&CellValue::Empty), None);
    }
}
