// ==========================================
// DMC 发票系统 - 领域类型定义
// ==========================================
// 职责: 连接键、日期区间、校验结果、作废判定口径
// ==========================================

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 供应商连接键 (Vendor Key)
// ==========================================
// 小写 + TRIM + 合并内部空白,仅用于与费率表连接
// 与展示名（分组/文件名）严格区分
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorKey(String);

impl VendorKey {
    /// 由任意文本生成连接键（幂等）
    pub fn from_raw(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        VendorKey(lowered.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VendorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ==========================================
// 账期 (Billing Period)
// ==========================================
// 闭区间 [from, to]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// 上一个自然月
    pub fn previous_month(today: NaiveDate) -> Self {
        let this_month = today.with_day(1).unwrap_or(today);
        let to = this_month.pred_opt().unwrap_or(this_month);
        let from = to.with_day(1).unwrap_or(to);
        Self { from, to }
    }

    pub fn is_valid(&self) -> bool {
        self.from <= self.to
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.from, self.to)
    }
}

// ==========================================
// 无效原因 (Invalid Reason)
// ==========================================
// 顺序即管道阶段顺序,合并报告按此排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidReason {
    UnparseableDate,     // 服务日期无法解析
    UnknownVendor,       // DMC 不在费率表
    UnknownServiceType,  // 服务类型不在费率表（严格模式）
    MissingRate,         // 无费率且无显式单价
    MissingCounts,       // 成人/儿童人数均缺失
    Unbillable,          // 行金额无法计算（溢出）
}

impl InvalidReason {
    /// 报告中的原因文本
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::UnparseableDate => "Service date could not be parsed",
            InvalidReason::UnknownVendor => "DMC is not known",
            InvalidReason::UnknownServiceType => "Service type is not known",
            InvalidReason::MissingRate => {
                "Service type is unknown and Price Adult/Child not defined"
            }
            InvalidReason::MissingCounts => "Both adult and children count is missing",
            InvalidReason::Unbillable => "Line total could not be computed",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 校验结果 (Validation Outcome)
// ==========================================
// 每条记录有且只有一个结果（账期外记录除外,直接丢弃）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationOutcome {
    Serviced,
    Cancelled,
    Invalid(InvalidReason),
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationOutcome::Serviced => write!(f, "SERVICED"),
            ValidationOutcome::Cancelled => write!(f, "CANCELLED"),
            ValidationOutcome::Invalid(reason) => write!(f, "INVALID({})", reason),
        }
    }
}

// ==========================================
// 作废列缺失口径 (Missing Cancellation Column)
// ==========================================
// 整批数据缺少 Remarks / Delivery 列时该子条件的取值
// 默认 NotCancelled: 缺列即无信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingColumnPolicy {
    #[default]
    NotCancelled,
    Cancelled,
}

impl MissingColumnPolicy {
    pub fn as_signal(&self) -> bool {
        matches!(self, MissingColumnPolicy::Cancelled)
    }
}
