// ==========================================
// DMC 发票系统 - 导入 Trait
// ==========================================
// 职责: 定义读取层接口（不包含实现）
// ==========================================

use crate::domain::booking::{BookingBatch, BookingRecord};
use crate::domain::cell::Row;
use crate::importer::error::ImportResult;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 单表文件解析（首行表头）
// 实现者: ExcelParser, CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文件为行记录（列名 → 值）
    ///
    /// # 参数
    /// - file_path: 文件路径
    ///
    /// # 返回
    /// - Ok(Vec<Row>): 行记录列表（已跳过全空行）
    /// - Err: 文件读取错误、格式错误
    fn parse_to_rows(&self, file_path: &Path) -> ImportResult<Vec<Row>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 行记录 → 预订记录
// 实现者: BookingFieldMapper
pub trait FieldMapper: Send + Sync {
    /// 将一行映射为预订记录（原始行完整保留）
    fn map_to_booking(&self, row: Row) -> BookingRecord;

    /// 映射整批,并记录作废相关列是否存在
    fn map_batch(&self, rows: Vec<Row>) -> BookingBatch;
}
