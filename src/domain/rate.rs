// ==========================================
// DMC 发票系统 - 费率领域模型
// ==========================================
// 职责: (供应商, 服务类型) → 成人/儿童单价
// 生命周期: 每次运行由费率表重建一次
// ==========================================

use crate::domain::types::VendorKey;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// 默认费率行的供应商名
pub const DEFAULT_VENDOR: &str = "Default";

/// 儿童费率所在的服务类型列
pub const CHILD_SERVICE_TYPE: &str = "Child";

// ==========================================
// RateEntry - 单条费率（长表一行）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub vendor: String,          // 费率表中的展示名（TRIM 后）
    pub vendor_key: VendorKey,   // 连接键
    pub service_type: String,    // 标准化服务类型
    pub adult_rate: Decimal,
    pub child_rate: Option<Decimal>, // 仅降级模式下可能缺失
}

// ==========================================
// RateLookup - 费率查询表
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct RateLookup {
    entries: Vec<RateEntry>,
    index: HashMap<(VendorKey, String), usize>,
    vendors: HashMap<VendorKey, String>,
    service_types: HashSet<String>,
    default_applied: bool,
}

impl RateLookup {
    /// 创建空表
    ///
    /// # 参数
    /// - default_applied: 是否已用 Default 行补齐缺失值
    pub fn new(default_applied: bool) -> Self {
        Self {
            default_applied,
            ..Default::default()
        }
    }

    /// 登记供应商（即使该供应商没有任何有效费率,也视为已知）
    pub fn register_vendor(&mut self, vendor_key: VendorKey, display_name: String) {
        self.vendors.entry(vendor_key).or_insert(display_name);
    }

    /// 插入费率,同键已存在时保留先到者
    ///
    /// # 返回
    /// - true: 插入成功
    /// - false: 键重复被忽略
    pub fn insert(&mut self, entry: RateEntry) -> bool {
        let key = (entry.vendor_key.clone(), entry.service_type.clone());
        if self.index.contains_key(&key) {
            return false;
        }
        self.register_vendor(entry.vendor_key.clone(), entry.vendor.clone());
        self.service_types.insert(entry.service_type.clone());
        self.index.insert(key, self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, vendor_key: &VendorKey, service_type: &str) -> Option<&RateEntry> {
        self.index
            .get(&(vendor_key.clone(), service_type.to_string()))
            .map(|&idx| &self.entries[idx])
    }

    pub fn knows_vendor(&self, vendor_key: &VendorKey) -> bool {
        self.vendors.contains_key(vendor_key)
    }

    pub fn knows_service_type(&self, service_type: &str) -> bool {
        self.service_types.contains(service_type)
    }

    /// 供应商展示名
    pub fn vendor_name(&self, vendor_key: &VendorKey) -> Option<&str> {
        self.vendors.get(vendor_key).map(String::as_str)
    }

    pub fn entries(&self) -> &[RateEntry] {
        &self.entries
    }

    pub fn vendor_count(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }

    pub fn default_applied(&self) -> bool {
        self.default_applied
    }
}
