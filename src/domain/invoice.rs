// ==========================================
// DMC 发票系统 - 发票领域模型
// ==========================================
// 职责: 每个供应商一张发票: 明细行（按服务日期升序）+ 合计
// 生命周期: 每次生成时新建,不跨运行持久化（仅写出文件）
// ==========================================

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// InvoiceLine - 发票明细行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub tour_code: Option<String>,
    pub service_date: NaiveDate,
    pub service_type: String,
    pub adult: Decimal,
    pub children: Decimal,
    pub price_adult: Decimal,
    pub price_child: Decimal,
    pub total: Decimal, // adult × price_adult + children × price_child
}

impl InvoiceLine {
    /// 行金额（计算值,渲染层可改写为公式）
    ///
    /// # 返回
    /// - None: 结果超出 Decimal 表示范围
    pub fn compute_total(
        adult: Decimal,
        price_adult: Decimal,
        children: Decimal,
        price_child: Decimal,
    ) -> Option<Decimal> {
        adult
            .checked_mul(price_adult)?
            .checked_add(children.checked_mul(price_child)?)
    }
}

// ==========================================
// Invoice - 供应商发票
// ==========================================
// 身份 = 供应商展示名（输出文件名）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub vendor: String,
    pub lines: Vec<InvoiceLine>,
    pub grand_total: Decimal,
}
