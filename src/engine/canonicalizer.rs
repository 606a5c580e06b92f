// ==========================================
// DMC 发票系统 - 供应商名称规范化器
// ==========================================
// 职责: 自由文本 DMC 名称 → 连接键 / 规范展示名
// 规则: 小写 + TRIM + 合并空白（连接键）;Title Case + 别名表（展示名）
// ==========================================

use crate::domain::types::VendorKey;
use std::collections::{BTreeMap, HashMap};

/// 连接键规范化（纯函数、幂等）
pub fn canonicalize(raw_name: &str) -> VendorKey {
    VendorKey::from_raw(raw_name)
}

/// 合并空白并 TRIM
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title Case: 每段字母的首字母大写、其余小写
///
/// 非字母字符（数字、撇号、连字符）都会开启新的一段,
/// 例如 "g2travel" → "G2Travel", "dmc's" → "Dmc'S"
pub fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut prev_is_alpha = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if prev_is_alpha {
                result.extend(ch.to_lowercase());
            } else {
                result.extend(ch.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            result.push(ch);
            prev_is_alpha = false;
        }
    }
    result
}

/// 服务类型标准化: Title Case + TRIM + 合并空白
pub fn normalize_service_type(value: &str) -> String {
    collapse_whitespace(&title_case(value))
}

// ==========================================
// VendorCanonicalizer - 带别名表的规范化器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct VendorCanonicalizer {
    /// 别名连接键 → 规范展示名
    aliases: HashMap<VendorKey, String>,
}

impl VendorCanonicalizer {
    /// 创建规范化器
    ///
    /// # 参数
    /// - aliases: 原始拼写 → 规范展示名（原始拼写按连接键匹配,大小写/空白不敏感）
    pub fn new(aliases: &BTreeMap<String, String>) -> Self {
        let aliases = aliases
            .iter()
            .map(|(raw, canonical)| (canonicalize(raw), collapse_whitespace(canonical)))
            .collect();
        Self { aliases }
    }

    /// 无别名表的规范化器
    pub fn without_aliases() -> Self {
        Self::default()
    }

    /// 规范展示名: Title Case + 合并空白,命中别名表则替换
    ///
    /// # 返回
    /// - None: 名称为空白
    pub fn display_name(&self, raw_name: &str) -> Option<String> {
        let titled = collapse_whitespace(&title_case(raw_name));
        if titled.is_empty() {
            return None;
        }
        match self.aliases.get(&canonicalize(&titled)) {
            Some(canonical) => Some(canonical.clone()),
            None => Some(titled),
        }
    }

    /// 连接键: 先经别名表,再做连接键规范化
    ///
    /// # 返回
    /// - None: 名称为空白
    pub fn vendor_key(&self, raw_name: &str) -> Option<VendorKey> {
        let key = canonicalize(raw_name);
        if key.is_empty() {
            return None;
        }
        match self.aliases.get(&key) {
            Some(canonical) => Some(canonicalize(canonical)),
            None => Some(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        assert_eq!(canonicalize("  ACME   Tours ").as_str(), "acme tours");
        assert_eq!(canonicalize("").as_str(), "");
    }

    #[test]
    fn test_canonicalize_idempotent() {
        for input in ["Star  Our", "  G2-Travel\t", "WHATS APP", "Dmc’S  x", "ÉTÉ Voyages"] {
            let once = canonicalize(input);
            assert_eq!(canonicalize(once.as_str()), once, "input={:?}", input);
        }
    }

    #[test]
    fn test_title_case_matches_word_boundaries() {
        assert_eq!(title_case("g2travel"), "G2Travel");
        assert_eq!(title_case("gateways group of dmc's"), "Gateways Group Of Dmc'S");
        assert_eq!(title_case("CITY tour"), "City Tour");
        assert_eq!(title_case("g2-travel"), "G2-Travel");
    }

    #[test]
    fn test_normalize_service_type() {
        assert_eq!(normalize_service_type("  city   TOUR "), "City Tour");
        assert_eq!(normalize_service_type("child"), "Child");
    }

    #[test]
    fn test_display_name_uses_aliases() {
        let mut aliases = BTreeMap::new();
        aliases.insert("Tc".to_string(), "TC".to_string());
        aliases.insert("G2Travel".to_string(), "G2 Travels".to_string());
        let canonicalizer = VendorCanonicalizer::new(&aliases);

        assert_eq!(canonicalizer.display_name("tc"), Some("TC".to_string()));
        assert_eq!(
            canonicalizer.display_name(" g2travel "),
            Some("G2 Travels".to_string())
        );
        assert_eq!(
            canonicalizer.display_name("acme  tours"),
            Some("Acme Tours".to_string())
        );
        assert_eq!(canonicalizer.display_name("   "), None);
    }

    #[test]
    fn test_vendor_key_through_alias() {
        let mut aliases = BTreeMap::new();
        aliases.insert("Star Our".to_string(), "Star Tour".to_string());
        let canonicalizer = VendorCanonicalizer::new(&aliases);

        assert_eq!(
            canonicalizer.vendor_key("STAR  OUR"),
            Some(canonicalize("Star Tour"))
        );
        assert_eq!(
            canonicalizer.vendor_key("Acme"),
            Some(canonicalize("acme"))
        );
        assert_eq!(canonicalizer.vendor_key(""), None);
    }

    #[test]
    fn test_without_aliases_is_plain_canonicalize() {
        let canonicalizer = VendorCanonicalizer::without_aliases();
        assert_eq!(
            canonicalizer.vendor_key(" ACME TOURS "),
            Some(canonicalize("acme tours"))
        );
    }
}
