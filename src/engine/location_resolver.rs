// ==========================================
// 促销日历对账系统 - 门店集合解析
// ==========================================
// 职责: 自由文本 → LocationSet; 两个集合的冲突分类
// 红线: 解析结果永不为空; 无法识别时退回全集（最保守假设）
// ==========================================

use crate::config::OverrideTables;
use crate::domain::location::{Location, LocationSet};
use crate::domain::types::ConflictKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

static EXCEPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bexcept\b[\s:)\]]*(.*)$").expect("valid except regex"));

static LIST_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[,;/|\n]|\band\b").expect("valid list split regex"));

/// 视为"全部门店"的占位文本
const UNIVERSE_PLACEHOLDERS: &[&str] = &[
    "", "nan", "none", "-", "n/a", "na", "not specified", "all", "all locations",
    "all stores", "all locations.", "everywhere",
];

/// 内置门店同义词（小写 → 标准门店）
const BUILTIN_SYNONYMS: &[(&str, Location)] = &[
    ("beverly", Location::BeverlyHills),
    ("bev hills", Location::BeverlyHills),
    ("fresno", Location::FresnoPalm),
    ("fresno palm", Location::FresnoPalm),
    ("fresno - palm", Location::FresnoPalm),
    ("fresno shaw", Location::FresnoShaw),
    ("fresno - shaw", Location::FresnoShaw),
    ("weho", Location::WestHollywood),
    ("laguna", Location::LagunaWoods),
    ("ktown", Location::Koreatown),
];

// ==========================================
// LocationConflict - 冲突分类结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConflict {
    pub kind: ConflictKind,
    pub conflicting: LocationSet, // 下级 ∩ 上级
    pub surviving: LocationSet,   // 下级 − 上级
}

// ==========================================
// LocationResolver - 门店解析器
// ==========================================
pub struct LocationResolver<'a> {
    tables: Option<&'a OverrideTables>,
}

impl LocationResolver<'static> {
    /// 仅使用内置同义词
    pub fn builtin() -> Self {
        Self { tables: None }
    }
}

impl<'a> LocationResolver<'a> {
    pub fn new(tables: &'a OverrideTables) -> Self {
        Self {
            tables: Some(tables),
        }
    }

    /// 单个门店名 → 标准门店
    ///
    /// # 规则
    /// 1. 人工同义词表
    /// 2. 标准门店名
    /// 3. 内置同义词
    /// 4. 逐个去掉前导词（公司名前缀, 如 "Acme Dispensary - Davis"）后重试
    pub fn normalize_store_name(&self, raw: &str) -> Option<Location> {
        let cleaned = clean_token(raw);
        if cleaned.is_empty() {
            return None;
        }

        if let Some(found) = self.lookup(&cleaned) {
            return Some(found);
        }

        // 前缀分隔符: "Company - Store"
        for sep in [" - ", " – ", " — ", ": "] {
            if let Some((_, tail)) = cleaned.rsplit_once(sep) {
                if let Some(found) = self.lookup(tail.trim()) {
                    return Some(found);
                }
            }
        }

        let words: Vec<&str> = cleaned.split_whitespace().collect();
        (1..words.len()).find_map(|skip| self.lookup(&words[skip..].join(" ")))
    }

    fn lookup(&self, name: &str) -> Option<Location> {
        if let Some(tables) = self.tables {
            if let Some(target) = tables.location_synonym(name) {
                if let Some(loc) = Location::from_canonical(target) {
                    return Some(loc);
                }
                warn!(raw = name, target = target, "门店同义词指向未知门店");
            }
        }

        if let Some(loc) = Location::from_canonical(name) {
            return Some(loc);
        }

        let lower = name.to_lowercase();
        BUILTIN_SYNONYMS
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, loc)| *loc)
    }

    /// 门店文本 → 门店集合
    ///
    /// # 规则
    /// - 空白/占位文本 → 全集
    /// - 含 "except" → 全集减去其后列出的门店
    /// - 否则按列表解析; 一个都识别不了 → 全集
    ///
    /// # 返回
    /// 永不为空的 LocationSet; 未识别文本保留在 unknown_tokens 中
    pub fn resolve(&self, text: &str) -> LocationSet {
        let trimmed = text.trim();
        let lower = trimmed.to_lowercase();

        if UNIVERSE_PLACEHOLDERS.contains(&lower.as_str()) {
            return LocationSet::universe();
        }

        if let Some(caps) = EXCEPT_RE.captures(trimmed) {
            let list = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let (excluded, unknown) = self.parse_list(list);
            if excluded.is_empty() {
                debug!(text = trimmed, "except 列表为空, 视为全部门店");
                return LocationSet::universe().with_unknown(unknown);
            }
            let remaining = LocationSet::universe().difference(&LocationSet::from_members(excluded));
            if remaining.is_empty() {
                warn!(text = trimmed, "except 列表排除了全部门店, 按全部门店处理");
                return LocationSet::universe().with_unknown(unknown);
            }
            return remaining.with_unknown(unknown);
        }

        if lower.starts_with("all locations") || lower.starts_with("all stores") {
            return LocationSet::universe();
        }

        let (members, unknown) = self.parse_list(trimmed);
        if members.is_empty() {
            warn!(text = trimmed, "门店文本无法识别, 按全部门店处理");
            return LocationSet::universe().with_unknown(unknown);
        }
        if !unknown.is_empty() {
            debug!(text = trimmed, unknown = ?unknown, "部分门店无法识别");
        }

        LocationSet::from_members(members).with_unknown(unknown)
    }

    fn parse_list(&self, list: &str) -> (Vec<Location>, Vec<String>) {
        let mut members = Vec::new();
        let mut unknown = Vec::new();

        for token in LIST_SPLIT_RE.split(list) {
            let cleaned = clean_token(token);
            if cleaned.is_empty() {
                continue;
            }

            let found = self.normalize_store_name(&cleaned).or_else(|| {
                // 回退: 只取附注前的部分 "Davis (opening soon)"
                [" (", " | ", " - "].iter().find_map(|sep| {
                    cleaned
                        .split_once(sep)
                        .and_then(|(head, _)| self.normalize_store_name(head))
                })
            });

            match found {
                Some(loc) => members.push(loc),
                None => unknown.push(cleaned),
            }
        }

        (members, unknown)
    }
}

/// 去掉两端空白与括号/标点
fn clean_token(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| matches!(c, '[' | ']' | ':' | '.' | '*') || c.is_whitespace());

    // 仅在括号不成对时剥离, 保留 "Fresno (Palm)"
    let opens = trimmed.matches('(').count();
    let closes = trimmed.matches(')').count();
    let trimmed = if opens != closes {
        trimmed.trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace())
    } else if trimmed.starts_with('(') && trimmed.ends_with(')') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    };

    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 下级促销门店 (subordinate) 与上级促销门店 (dominant) 的冲突分类
///
/// # 规则
/// - 无交集 → NONE
/// - 下级门店全部被覆盖 → FULL
/// - 否则 → PARTIAL, surviving 为下级剩余门店
pub fn classify_conflict(subordinate: &LocationSet, dominant: &LocationSet) -> LocationConflict {
    let conflicting = subordinate.intersection(dominant);
    let surviving = subordinate.difference(dominant);

    let kind = if conflicting.is_empty() {
        ConflictKind::None
    } else if surviving.is_empty() {
        ConflictKind::Full
    } else {
        ConflictKind::Partial
    };

    LocationConflict {
        kind,
        conflicting,
        surviving,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(text: &str) -> LocationSet {
        LocationResolver::builtin().resolve(text)
    }

    #[test]
    fn test_placeholders_resolve_to_universe() {
        for text in ["", "  ", "All Locations", "nan", "N/A", "-", "not specified"] {
            assert!(resolve(text).is_universe(), "'{}' 应解析为全集", text);
        }
    }

    #[test]
    fn test_explicit_list() {
        let set = resolve("Davis, Dixon");
        assert_eq!(
            set,
            LocationSet::from_members([Location::Davis, Location::Dixon])
        );
    }

    #[test]
    fn test_except_list() {
        let set = resolve("All Locations Except: Davis, Dixon");
        assert_eq!(set.len(), 10);
        assert!(!set.contains(Location::Davis));
        assert!(!set.contains(Location::Dixon));
        assert!(set.contains(Location::Oxnard));
    }

    #[test]
    fn test_except_with_parentheses() {
        let set = resolve("All Locations (Except Hawthorne)");
        assert_eq!(set.len(), 11);
        assert!(!set.contains(Location::Hawthorne));
    }

    #[test]
    fn test_company_prefix_and_synonyms() {
        let resolver = LocationResolver::builtin();
        assert_eq!(
            resolver.normalize_store_name("Acme Dispensary - Davis"),
            Some(Location::Davis)
        );
        assert_eq!(
            resolver.normalize_store_name("The Green Room Oxnard"),
            Some(Location::Oxnard)
        );
        assert_eq!(
            resolver.normalize_store_name("Fresno Shaw"),
            Some(Location::FresnoShaw)
        );
        assert_eq!(
            resolver.normalize_store_name("Fresno (Palm)"),
            Some(Location::FresnoPalm)
        );
        assert_eq!(resolver.normalize_store_name("Beverly"), Some(Location::BeverlyHills));
    }

    #[test]
    fn test_unknown_tokens_kept_for_display() {
        let set = resolve("Davis, Moonbase");
        assert_eq!(set, LocationSet::from_members([Location::Davis]));
        assert_eq!(set.unknown_tokens(), &["Moonbase".to_string()]);
    }

    #[test]
    fn test_all_unknown_falls_back_to_universe() {
        let set = resolve("Moonbase, Atlantis");
        assert!(set.is_universe());
        assert_eq!(set.unknown_tokens().len(), 2);
    }

    #[test]
    fn test_except_every_store_falls_back_to_universe() {
        let all = Location::ALL
            .iter()
            .map(|loc| loc.display_name())
            .collect::<Vec<_>>()
            .join(", ");
        let set = resolve(&format!("All Locations Except: {}", all));
        assert!(set.is_universe());
    }

    #[test]
    fn test_resolve_never_empty() {
        let all = Location::ALL
            .iter()
            .map(|loc| loc.display_name())
            .collect::<Vec<_>>()
            .join(", ");
        let inputs = [
            format!("All Locations Except: {}", all),
            format!("Except {}", all),
            "except".to_string(),
            "All Locations Except:".to_string(),
            ",,;;".to_string(),
            "...".to_string(),
            "()".to_string(),
            "Davis,".to_string(),
        ];
        for text in &inputs {
            assert!(!resolve(text).is_empty(), "'{}' 解析结果不应为空", text);
        }
    }

    #[test]
    fn test_user_synonym_wins() {
        let mut tables = OverrideTables::default();
        tables
            .location_synonyms
            .insert("Bixby".to_string(), "Riverside".to_string());
        let resolver = LocationResolver::new(&tables);
        assert_eq!(resolver.resolve("bixby"), LocationSet::from_members([Location::Riverside]));
    }

    #[test]
    fn test_classify_conflict() {
        let weekly = LocationSet::universe();
        let monthly = LocationSet::from_members([Location::Davis, Location::Dixon]);

        let partial = classify_conflict(&weekly, &monthly);
        assert_eq!(partial.kind, ConflictKind::Partial);
        assert_eq!(partial.conflicting, monthly);
        assert_eq!(partial.surviving, weekly.difference(&monthly));

        let full = classify_conflict(&monthly, &weekly);
        assert_eq!(full.kind, ConflictKind::Full);
        assert!(full.surviving.is_empty());

        let none = classify_conflict(
            &LocationSet::from_members([Location::Oxnard]),
            &monthly,
        );
        assert_eq!(none.kind, ConflictKind::None);
    }
}
