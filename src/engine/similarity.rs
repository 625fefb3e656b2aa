// ==========================================
// 促销日历对账系统 - 文本相似度
// ==========================================
// 职责: 品牌名等短文本的 0-100 相似度
// 工具: strsim::normalized_levenshtein
// ==========================================

use std::collections::BTreeSet;

/// 分词: 小写化, 按非字母数字切分
fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// 整串相似度 (0-100)
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// 词集合相似度 (0-100)
///
/// # 规则
/// - 任一侧无有效词 → 0
/// - 一侧词集合是另一侧子集 → 100
/// - 否则取 交集 / 交集+差集A / 交集+差集B 三者两两相似度的最大值
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0;
    }

    let common: Vec<&str> = tokens_a.intersection(&tokens_b).map(|s| s.as_str()).collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).map(|s| s.as_str()).collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).map(|s| s.as_str()).collect();

    if !common.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100;
    }

    let base = common.join(" ");
    let with_a = join_nonempty(&base, &only_a.join(" "));
    let with_b = join_nonempty(&base, &only_b.join(" "));

    let mut best = ratio(&with_a, &with_b);
    if !base.is_empty() {
        best = best.max(ratio(&base, &with_a)).max(ratio(&base, &with_b));
    }
    best
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{} {}", a, b),
    }
}

/// 双方互相包含（大小写不敏感, 非空）
pub fn is_containment(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() || a == b {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}
