// ==========================================
// DMC 发票系统 - 核心库
// ==========================================
// 系统定位: 餐厅团餐排期 → 按供应商（DMC）开票
// 数据流: 排期表 + 费率表 → 记录划分 → 发票 / 作废表 / 无效表
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 核心规则
pub mod engine;

// 读取层 - 外部数据
pub mod importer;

// 输出层 - 工作簿写出
pub mod writer;

// 配置层 - 应用配置
pub mod config;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::AppConfig;
pub use domain::{
    BookingRecord, DateRange, InvalidGroup, InvalidReason, Invoice, InvoiceLine, RateLookup,
    ServicedBooking, Table, ValidationOutcome, VendorKey,
};
pub use engine::{InvoiceRun, PartitionResult, ProgressReporter, RunError, RunRequest};

// ==========================================
// 系统常量
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
