// ==========================================
// DMC 发票系统 - 输出层
// ==========================================
// 职责: 发票工作簿、无效/作废辅助表写出
// 红线: 只负责版式,不做任何分类/计算
// ==========================================

pub mod error;
pub mod invoice_writer;
pub mod table_writer;

pub use error::{WriterError, WriterResult};
pub use invoice_writer::{invoice_file_name, InvoiceWriter};
pub use table_writer::write_table;
