// ==========================================
// DMC 发票系统 - 费率表规范化
// ==========================================
// 职责: 宽表（每供应商一行、每服务类型一列）→ 长表查询
// 流程: 识别 DMC 列 → 定位 Default 行 → 缺失值按列补齐 →
//       宽转长 → Child 列回填为儿童费率 → 生成连接键
// 降级: 无 Default 行时告警并跳过补齐
// ==========================================

use crate::domain::cell::Row;
use crate::domain::rate::{RateEntry, RateLookup, CHILD_SERVICE_TYPE, DEFAULT_VENDOR};
use crate::engine::canonicalizer::{canonicalize, normalize_service_type};
use crate::engine::events::ProgressReporter;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

/// 费率表中的供应商列名（大小写不敏感）
pub const VENDOR_COLUMN: &str = "DMC";

/// 一行宽表: 供应商 + 各服务类型列的值
#[derive(Debug, Clone)]
struct WideRateRow {
    vendor: String,
    values: Vec<Option<Decimal>>,
}

// ==========================================
// RateNormalizer - 费率表规范化器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RateNormalizer {
    reporter: ProgressReporter,
}

impl RateNormalizer {
    pub fn new(reporter: ProgressReporter) -> Self {
        Self { reporter }
    }

    /// 规范化费率表
    ///
    /// # 参数
    /// - raw_rows: 读取层产出的行（列名 → 值）
    ///
    /// # 返回
    /// - RateLookup: (连接键, 服务类型) → 成人/儿童费率
    #[instrument(skip(self, raw_rows), fields(rows = raw_rows.len()))]
    pub fn normalize(&self, raw_rows: &[Row]) -> RateLookup {
        // === 步骤 1: 识别列 ===
        let Some(vendor_column) = find_vendor_column(raw_rows) else {
            warn!("费率表缺少 DMC 列");
            self.reporter
                .report(format!("Rates sheet has no '{}' column", VENDOR_COLUMN));
            return RateLookup::new(false);
        };
        let service_columns = service_columns(raw_rows, &vendor_column);
        let service_types: Vec<String> = service_columns
            .iter()
            .map(|c| normalize_service_type(c))
            .collect();
        debug!(vendor_column = %vendor_column, service_types = ?service_types, "费率表列识别完成");

        // === 步骤 2: 解析宽表 ===
        let mut wide_rows = Vec::with_capacity(raw_rows.len());
        for (idx, row) in raw_rows.iter().enumerate() {
            let Some(vendor) = row.get(&vendor_column).and_then(|v| v.as_text()) else {
                debug!(row = idx + 1, "费率行缺少供应商名,跳过");
                continue;
            };
            let values = service_columns
                .iter()
                .map(|column| {
                    let cell = row.get(column)?;
                    if cell.is_empty() {
                        return None;
                    }
                    let parsed = cell.as_decimal();
                    if parsed.is_none() {
                        warn!(vendor = %vendor, column = %column, value = %cell, "费率不是数值,按缺失处理");
                    }
                    parsed
                })
                .collect();
            wide_rows.push(WideRateRow { vendor, values });
        }

        // === 步骤 3: Default 行补齐 ===
        let default_values = wide_rows
            .iter()
            .find(|r| r.vendor == DEFAULT_VENDOR)
            .map(|r| r.values.clone());
        let default_applied = match &default_values {
            Some(defaults) => {
                for row in &mut wide_rows {
                    for (value, default) in row.values.iter_mut().zip(defaults) {
                        if value.is_none() {
                            *value = *default;
                        }
                    }
                }
                true
            }
            None => {
                self.reporter.report("Default rates not found");
                false
            }
        };

        // === 步骤 4: 宽转长 + 儿童费率回填 ===
        let child_idx = service_types.iter().position(|t| t == CHILD_SERVICE_TYPE);
        let mut lookup = RateLookup::new(default_applied);
        for row in &wide_rows {
            let vendor_key = canonicalize(&row.vendor);
            lookup.register_vendor(vendor_key.clone(), row.vendor.clone());

            let child_rate = child_idx.and_then(|idx| row.values[idx]);
            for (service_type, value) in service_types.iter().zip(&row.values) {
                let Some(adult_rate) = value else {
                    continue;
                };
                let inserted = lookup.insert(RateEntry {
                    vendor: row.vendor.clone(),
                    vendor_key: vendor_key.clone(),
                    service_type: service_type.clone(),
                    adult_rate: *adult_rate,
                    child_rate,
                });
                if !inserted {
                    warn!(vendor = %row.vendor, service_type = %service_type, "费率重复,保留首条");
                }
            }
        }

        info!(
            vendors = lookup.vendor_count(),
            entries = lookup.entries().len(),
            default_applied,
            "费率表规范化完成"
        );
        lookup
    }
}

/// 查找供应商列（TRIM + 大小写不敏感）
fn find_vendor_column(rows: &[Row]) -> Option<String> {
    rows.iter()
        .flat_map(|row| row.keys())
        .find(|column| column.trim().eq_ignore_ascii_case(VENDOR_COLUMN))
        .cloned()
}

/// 服务类型列 = 除供应商列外的所有非空列名（首次出现顺序）
fn service_columns(rows: &[Row], vendor_column: &str) -> Vec<String> {
    let mut columns: IndexMap<String, ()> = IndexMap::new();
    for row in rows {
        for column in row.keys() {
            if column != vendor_column && !column.trim().is_empty() {
                columns.entry(column.clone()).or_insert(());
            }
        }
    }
    columns.into_keys().collect()
}
