// ==========================================
// DMC 发票系统 - 读取层
// ==========================================
// 职责: 排期文件发现、工作表读取、费率表读取、字段映射与清洗
// 支持: Excel (.xlsx/.xls), CSV（仅费率表）
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod schedule_reader;

// 重导出核心类型
pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::BookingFieldMapper;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use schedule_reader::{
    list_schedule_files, schedule_directories, ScheduleData, ScheduleReader, SheetNotFound,
    SheetTypo,
};

// 重导出 Trait 接口
pub use importer_trait::{FieldMapper, FileParser};
