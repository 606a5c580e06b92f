// ==========================================
// DMC 发票系统 - 报告表格模型
// ==========================================
// 职责: 无效记录分组、作废记录表、合并无效报告
// 用途: 交给输出层写成工作簿
// ==========================================

use crate::domain::booking::{columns, BookingRecord};
use crate::domain::cell::{CellValue, Row};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

// ==========================================
// Table - 通用二维表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// 由行集合构造,列顺序 = 各行列名首次出现顺序
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut seen: IndexSet<String> = IndexSet::new();
        for row in &rows {
            for column in row.keys() {
                if !seen.contains(column) {
                    seen.insert(column.clone());
                }
            }
        }
        Self {
            columns: seen.into_iter().collect(),
            rows,
        }
    }

    /// 由预订记录构造（原样输出源列）
    pub fn from_records(records: &[BookingRecord]) -> Self {
        Self::from_rows(records.iter().map(|r| r.row.clone()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 取单元格（缺列视为空）
    pub fn cell(&self, row_idx: usize, column: &str) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row_idx)
            .and_then(|row| row.get(column))
            .unwrap_or(&EMPTY)
    }

    /// 去掉所有行均为空的列
    pub fn drop_empty_columns(mut self) -> Self {
        let keep: Vec<String> = self
            .columns
            .iter()
            .filter(|column| {
                self.rows
                    .iter()
                    .any(|row| row.get(column.as_str()).is_some_and(|v| !v.is_empty()))
            })
            .cloned()
            .collect();
        for row in &mut self.rows {
            row.retain(|column, _| keep.contains(column));
        }
        self.columns = keep;
        self
    }
}

// ==========================================
// InvalidGroup - 一组同原因的无效记录
// ==========================================
// 红线: 原因列永远在首列;全空列已剔除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidGroup {
    pub reason: String,
    pub table: Table,
}

impl InvalidGroup {
    /// 由管道拒绝的记录构造
    ///
    /// # 返回
    /// - None: 记录为空（不产生分组）
    pub fn from_records(reason: impl Into<String>, records: &[BookingRecord]) -> Option<Self> {
        Self::from_rows(reason, records.iter().map(|r| r.row.clone()).collect())
    }

    /// 由外部协作方预先构造的行构造（缺表/疑似拼写错误等）
    pub fn from_rows(reason: impl Into<String>, rows: Vec<Row>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let reason = reason.into();
        let table = Table::from_rows(rows).drop_empty_columns();

        let mut tagged_columns = Vec::with_capacity(table.columns.len() + 1);
        tagged_columns.push(columns::REASON.to_string());
        tagged_columns.extend(table.columns.into_iter().filter(|c| c != columns::REASON));

        let rows = table
            .rows
            .into_iter()
            .map(|row| {
                let mut tagged = Row::with_capacity(row.len() + 1);
                tagged.insert(columns::REASON.to_string(), CellValue::Text(reason.clone()));
                for (column, value) in row {
                    if column != columns::REASON {
                        tagged.insert(column, value);
                    }
                }
                tagged
            })
            .collect();

        Some(Self {
            reason,
            table: Table {
                columns: tagged_columns,
                rows,
            },
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// 合并无效分组（按传入顺序拼接,原因列首列）
pub fn combine_invalid_groups<'a, I>(groups: I) -> Table
where
    I: IntoIterator<Item = &'a InvalidGroup>,
{
    let mut rows = Vec::new();
    for group in groups {
        rows.extend(group.table.rows.iter().cloned());
    }
    if rows.is_empty() {
        return Table::default();
    }
    Table::from_rows(rows)
}
