// ==========================================
// DMC 发票系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含文件读写逻辑,不含管道逻辑
// ==========================================

pub mod booking;
pub mod cell;
pub mod invoice;
pub mod rate;
pub mod report;
pub mod types;

// 重导出核心类型
pub use booking::{columns, BookingBatch, BookingDerived, BookingRecord, ServicedBooking};
pub use cell::{CellValue, Row};
pub use invoice::{Invoice, InvoiceLine};
pub use rate::{RateEntry, RateLookup, CHILD_SERVICE_TYPE, DEFAULT_VENDOR};
pub use report::{combine_invalid_groups, InvalidGroup, Table};
pub use types::{DateRange, InvalidReason, MissingColumnPolicy, ValidationOutcome, VendorKey};
