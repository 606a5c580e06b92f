// ==========================================
// DMC 发票系统 - 单元格与行模型
// ==========================================
// 职责: 表格读取器与核心之间的中立数据形态
// 用途: 读取层产出 Row,输出层消费 Row
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// CellValue - 单元格值
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// 空值判定（空白文本视为空）
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 文本视图（TRIM 后非空才返回）
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            other => Some(other.to_string()),
        }
    }

    /// 数值视图: 数字直接转换,文本尝试解析
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            CellValue::Number(n) => Decimal::from_f64(*n).map(|d| d.normalize()),
            CellValue::Text(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

/// 一行数据: 列名 → 值（保持源列顺序）
pub type Row = IndexMap<String, CellValue>;

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_is_empty() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::Text("   ".to_string()).is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
        assert!(!CellValue::Text("x".to_string()).is_empty());
    }

    #[test]
    fn test_as_decimal() {
        assert_eq!(CellValue::Number(13.0).as_decimal(), Some(dec("13")));
        assert_eq!(CellValue::Number(12.5).as_decimal(), Some(dec("12.5")));
        assert_eq!(CellValue::from(" 8 ").as_decimal(), Some(dec("8")));
        assert_eq!(CellValue::from("abc").as_decimal(), None);
        assert_eq!(CellValue::Empty.as_decimal(), None);
    }

    #[test]
    fn test_display_number_without_fraction() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
    }
}
