// ==========================================
// 促销日历对账系统 - 标签化 ID 编解码
// ==========================================
// 职责: 单元格文本 ↔ TaggedIdCell; 单个标签的替换/追加
// 红线: 解析时忽略空白与大小写; 格式化输出唯一的规范形式
// ==========================================

use crate::domain::tagged_id::{SlotTag, TaggedId, TaggedIdCell};
use crate::domain::types::FrequencyClass;
use regex::Regex;
use std::sync::LazyLock;

// 通用标签 W1/M2/SP 以及旧格式 Part1 / GAP / Patch
static TAG_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:([wms])([1-9p])|part\s*([1-9])|(gap)|(patch))\s*:\s*(\d+)(?:\.0)?\b")
        .expect("valid tag entry regex")
});

static PLAIN_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)(?:\.0)?\s*$").expect("valid plain id regex"));

static LINE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*([a-z_ ]*[a-z0-9_]|[wms][1-9p])\s*:").expect("valid line tag regex")
});

// ==========================================
// TaggedIdCodec - 编解码
// ==========================================
pub struct TaggedIdCodec;

impl TaggedIdCodec {
    /// 单元格文本 → TaggedIdCell
    ///
    /// # 规则
    /// - 条目可用逗号或换行分隔, 按出现顺序保留
    /// - 旧格式: PartN → WN, Patch → WP, GAP → WP
    /// - 没有任何标签且整格是一个数字 → W1
    /// - 空白或无法识别 → 空 Cell
    pub fn parse(text: &str) -> TaggedIdCell {
        let mut entries = Vec::new();

        for caps in TAG_ENTRY_RE.captures_iter(text) {
            let Some(id) = caps.get(6).map(|m| m.as_str().to_string()) else {
                continue;
            };

            let tag = if let (Some(section), Some(slot)) = (caps.get(1), caps.get(2)) {
                universal_tag(section.as_str(), slot.as_str())
            } else if let Some(part) = caps.get(3) {
                part.as_str().parse::<u8>().ok().map(SlotTag::weekly)
            } else {
                Some(SlotTag::weekly_patch())
            };

            if let Some(tag) = tag {
                entries.push(TaggedId::new(tag, id));
            }
        }

        if entries.is_empty() {
            if let Some(caps) = PLAIN_ID_RE.captures(text) {
                entries.push(TaggedId::new(SlotTag::weekly(1), caps[1].to_string()));
            }
        }

        TaggedIdCell::new(entries)
    }

    /// TaggedIdCell → 规范文本
    pub fn format(cell: &TaggedIdCell) -> String {
        cell.to_cell_string()
    }

    /// 标签别名 → SlotTag
    ///
    /// # 规则
    /// - w1 / weekly1 / weekly_1 / part1 → W1
    /// - wp / weekly_patch / patch / gap → WP
    /// - m1 / monthly1, s1 / sale1 等同理
    /// - 其他 → W1
    pub fn resolve_tag_alias(alias: &str) -> SlotTag {
        let key: String = alias
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '_' | ' ' | '-'))
            .collect();

        let (section, rest) = if let Some(rest) = key.strip_prefix("weekly") {
            (FrequencyClass::RecurringWeekly, rest)
        } else if let Some(rest) = key.strip_prefix("monthly") {
            (FrequencyClass::RecurringMonthly, rest)
        } else if let Some(rest) = key.strip_prefix("sale") {
            (FrequencyClass::OneOffSale, rest)
        } else if let Some(rest) = key.strip_prefix("part") {
            (FrequencyClass::RecurringWeekly, rest)
        } else if key == "gap" || key == "patch" {
            return SlotTag::weekly_patch();
        } else if key.is_ascii() && key.len() == 2 {
            if let Some(tag) = universal_tag(&key[..1], &key[1..]) {
                return tag;
            }
            return SlotTag::weekly(1);
        } else {
            return SlotTag::weekly(1);
        };

        match rest {
            "p" | "patch" => SlotTag::patch(section),
            digits => digits
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=9).contains(n))
                .map(|n| SlotTag::part(section, n))
                .unwrap_or_else(|| SlotTag::part(section, 1)),
        }
    }

    /// 更新单元格中的一个标签
    ///
    /// # 参数
    /// - existing: 原单元格文本
    /// - tag: 目标标签（别名会被解析）
    /// - new_id: 新 ID（可带标签前缀, 会被去掉）
    /// - append: true 时总是追加新行
    ///
    /// # 规则
    /// - new_id 为空 → 原样返回
    /// - 替换模式: 原地替换第一条同标签行, 删除其余同标签行; 找不到则追加
    /// - 非标签文本原样保留, 逗号分隔的条目拆成独立行
    pub fn update_cell(existing: &str, tag: &str, new_id: &str, append: bool) -> String {
        let id = strip_tag_prefix(new_id);
        if id.is_empty() {
            return existing.to_string();
        }

        let target = Self::resolve_tag_alias(tag);
        let new_line = TaggedId::new(target, id).to_string();

        let lines: Vec<String> = existing
            .split(['\n', ','])
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        if append {
            let mut lines = lines;
            lines.push(new_line);
            return lines.join("\n");
        }

        let mut output = Vec::with_capacity(lines.len() + 1);
        let mut replaced = false;
        for line in lines {
            if line_tag(&line) == Some(target) {
                if !replaced {
                    output.push(new_line.clone());
                    replaced = true;
                }
                continue;
            }
            output.push(line);
        }

        if !replaced {
            output.push(new_line);
        }
        output.join("\n")
    }
}

fn universal_tag(section: &str, slot: &str) -> Option<SlotTag> {
    let section = match section.to_ascii_lowercase().as_str() {
        "w" => FrequencyClass::RecurringWeekly,
        "m" => FrequencyClass::RecurringMonthly,
        "s" => FrequencyClass::OneOffSale,
        _ => return None,
    };
    match slot.to_ascii_lowercase().as_str() {
        "p" => Some(SlotTag::patch(section)),
        digit => digit
            .parse::<u8>()
            .ok()
            .filter(|n| (1..=9).contains(n))
            .map(|n| SlotTag::part(section, n)),
    }
}

/// 单行的标签（用于替换判断）
fn line_tag(line: &str) -> Option<SlotTag> {
    let caps = LINE_TAG_RE.captures(line)?;
    Some(TaggedIdCodec::resolve_tag_alias(&caps[1]))
}

/// "W1: 123" → "123"
fn strip_tag_prefix(value: &str) -> String {
    let trimmed = value.trim();
    let id = match trimmed.rsplit_once(':') {
        Some((_, tail)) => tail.trim(),
        None => trimmed,
    };
    id.strip_suffix(".0").unwrap_or(id).to_string()
}
