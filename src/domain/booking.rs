// ==========================================
// DMC 发票系统 - 预订记录领域模型
// ==========================================
// 职责: 排期表中的一行团餐预订 + 管道遍历中附加的派生字段
// 生命周期: 每次运行从排期表重建
// ==========================================

use crate::domain::cell::{CellValue, Row};
use crate::domain::invoice::InvoiceLine;
use crate::domain::types::VendorKey;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// 排期表标准列名（读取时已做 Title Case）
// ==========================================
pub mod columns {
    pub const FILE_NAME: &str = "File Name";
    pub const RESTAURANT: &str = "Restaurant";
    pub const TOUR_CODE: &str = "Tour Code";
    pub const SERVICE_DATE: &str = "Service Date";
    pub const SERVICE_TYPE: &str = "Service Type";
    pub const VENDOR: &str = "Dmc";
    pub const ADULT: &str = "Adult";
    pub const CHILDREN: &str = "Children";
    pub const REMARKS: &str = "Remarks";
    pub const DELIVERY: &str = "Delivery";
    pub const PRICE_ADULT: &str = "Price Adult";
    pub const PRICE_CHILD: &str = "Price Child";
    pub const SHEET_NAME: &str = "Sheet Name";
    pub const REASON: &str = "Reason";
}

// ==========================================
// BookingRecord - 预订记录
// ==========================================
// 源字段（已类型化）+ 原始整行（透传列）+ 派生字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    // ===== 源字段 =====
    pub restaurant: Option<String>,
    pub tour_code: Option<String>,
    pub service_date_raw: CellValue, // 原始日期（日期/日期时间/文本）
    pub service_type: Option<String>,
    pub vendor: Option<String>,      // 原始 DMC 名称
    pub adult: Option<Decimal>,
    pub children: Option<Decimal>,
    pub remarks: Option<String>,
    pub delivery: Option<String>,
    pub price_adult: Option<Decimal>, // 显式单价（优先于费率表）
    pub price_child: Option<Decimal>,

    // ===== 原始行（输出报告使用）=====
    pub row: Row,

    // ===== 派生字段（管道阶段写入）=====
    #[serde(default)]
    pub derived: BookingDerived,
}

/// 管道派生字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingDerived {
    pub service_date: Option<NaiveDate>,   // 阶段1: 日期解析
    pub vendor_key: Option<VendorKey>,     // 阶段4: 连接键
    pub service_type: Option<String>,      // 阶段5/6: 标准化服务类型
    pub vendor_name: Option<String>,       // 阶段6: 费率表中的展示名
    pub rate_adult: Option<Decimal>,       // 阶段6: 匹配到的成人费率
    pub rate_child: Option<Decimal>,       // 阶段6: 匹配到的儿童费率
}

// ==========================================
// BookingBatch - 一批预订记录
// ==========================================
// 列存在性按整批判断（缺列 ≠ 空值）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingBatch {
    pub records: Vec<BookingRecord>,
    pub has_remarks_column: bool,
    pub has_delivery_column: bool,
}

impl BookingBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ==========================================
// ServicedBooking - 可开票记录
// ==========================================
// 管道末端产物: 所有开票字段均已确定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicedBooking {
    pub record: BookingRecord,
    pub service_date: NaiveDate,
    pub vendor_key: VendorKey,
    pub vendor_name: String,
    pub service_type: String,
    pub adult: Decimal,
    pub children: Decimal,
    pub price_adult: Decimal,
    pub price_child: Decimal,
}

impl ServicedBooking {
    /// 行金额 = 成人数 × 成人单价 + 儿童数 × 儿童单价（溢出时 None）
    pub fn line_total(&self) -> Option<Decimal> {
        InvoiceLine::compute_total(self.adult, self.price_adult, self.children, self.price_child)
    }
}
