// ==========================================
// DMC 发票系统 - 疑似重复供应商检测
// ==========================================
// 职责: 对本次运行出现的规范供应商名两两比较编辑距离,
//       距离 <= 阈值且不在忽略表中的名称对作为告警输出
// 红线: 只告警,不改变任何记录的分类
// ==========================================

use crate::engine::events::ProgressReporter;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// 默认阈值
pub const DEFAULT_THRESHOLD: usize = 2;

/// Levenshtein 编辑距离（按字符,大小写敏感）
pub use strsim::levenshtein;

// ==========================================
// DuplicateDetector - 疑似重复检测器
// ==========================================
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    threshold: usize,
    ignored: HashSet<(String, String)>, // 无序对,按字典序存放
}

impl DuplicateDetector {
    /// 创建检测器
    ///
    /// # 参数
    /// - threshold: 最大编辑距离（含）
    /// - ignored_pairs: 已知不同的名称对（无序）
    pub fn new(threshold: usize, ignored_pairs: &[(String, String)]) -> Self {
        let ignored = ignored_pairs
            .iter()
            .map(|(a, b)| Self::ordered_pair(a, b))
            .collect();
        Self { threshold, ignored }
    }

    fn ordered_pair(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    pub fn is_ignored(&self, a: &str, b: &str) -> bool {
        self.ignored.contains(&Self::ordered_pair(a, b))
    }

    /// 查找疑似重复
    ///
    /// # 返回
    /// - 名称 → 其所有疑似重复（名称按字典序）
    ///
    /// # 说明
    /// - O(n²) 两两比较;名称量级在数百以内
    pub fn find_possible_duplicates(&self, names: &BTreeSet<String>) -> BTreeMap<String, Vec<String>> {
        let mut result = BTreeMap::new();
        for first in names {
            let dupes: Vec<String> = names
                .iter()
                .filter(|second| *second != first)
                .filter(|second| levenshtein(first, second) <= self.threshold)
                .filter(|second| !self.is_ignored(first, second))
                .cloned()
                .collect();
            if !dupes.is_empty() {
                debug!(name = %first, count = dupes.len(), "发现疑似重复供应商");
                result.insert(first.clone(), dupes);
            }
        }
        result
    }

    /// 查找并通过进度回调输出告警
    ///
    /// # 返回
    /// - 告警条数
    pub fn report_possible_duplicates(
        &self,
        names: &BTreeSet<String>,
        reporter: &ProgressReporter,
    ) -> usize {
        let found = self.find_possible_duplicates(names);
        for (name, dupes) in &found {
            reporter.report(format_warning(name, dupes));
        }
        found.len()
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, &[])
    }
}

fn format_warning(name: &str, dupes: &[String]) -> String {
    let quoted: Vec<String> = dupes.iter().map(|d| format!("'{}'", d)).collect();
    format!("Possible duplicates for '{}': [{}]", name, quoted.join(", "))
}
