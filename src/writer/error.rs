// ==========================================
// DMC 发票系统 - 输出模块错误类型
// ==========================================

use rust_xlsxwriter::XlsxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("工作簿写出失败: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("输出目录不可用: {0}")]
    Io(#[from] std::io::Error),

    #[error("发票无明细行: {0}")]
    EmptyInvoice(String),
}

pub type WriterResult<T> = Result<T, WriterError>;
