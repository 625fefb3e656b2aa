// ==========================================
// 促销日历对账系统 - 标签化外部 ID
// ==========================================
// 单元格格式: "W1: 12345\nW2: 12399\nWP: 12400"
// 分区字母: W=周循环 M=月循环 S=一次性; 槽位: 1-9 或 P(补丁)
// ==========================================

use crate::domain::types::FrequencyClass;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Slot - 槽位
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Part(u8), // 1..=9
    Patch,
}

// ==========================================
// SlotTag - 分区 + 槽位
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotTag {
    pub section: FrequencyClass,
    pub slot: Slot,
}

impl SlotTag {
    pub fn part(section: FrequencyClass, n: u8) -> Self {
        Self {
            section,
            slot: Slot::Part(n.clamp(1, 9)),
        }
    }

    pub fn patch(section: FrequencyClass) -> Self {
        Self {
            section,
            slot: Slot::Patch,
        }
    }

    /// 周循环第 N 段
    pub fn weekly(n: u8) -> Self {
        Self::part(FrequencyClass::RecurringWeekly, n)
    }

    pub fn weekly_patch() -> Self {
        Self::patch(FrequencyClass::RecurringWeekly)
    }

    /// 槽位序号（补丁槽位无序号）
    pub fn position(&self) -> Option<usize> {
        match self.slot {
            Slot::Part(n) => Some(n as usize),
            Slot::Patch => None,
        }
    }
}

impl fmt::Display for SlotTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = self.section.section_letter();
        match self.slot {
            Slot::Part(n) => write!(f, "{}{}", letter, n),
            Slot::Patch => write!(f, "{}P", letter),
        }
    }
}

// ==========================================
// TaggedId - 单个 (标签, ID) 对
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedId {
    pub tag: SlotTag,
    pub id: String, // 纯数字
}

impl TaggedId {
    pub fn new(tag: SlotTag, id: impl Into<String>) -> Self {
        Self { tag, id: id.into() }
    }
}

impl fmt::Display for TaggedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tag, self.id)
    }
}

// ==========================================
// TaggedIdCell - 解析后的单元格
// ==========================================
// 顺序即单元格中出现的顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedIdCell {
    entries: Vec<TaggedId>,
}

impl TaggedIdCell {
    pub fn new(entries: Vec<TaggedId>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TaggedId] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn first_id(&self) -> Option<&str> {
        self.entries.first().map(|e| e.id.as_str())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    /// 指定标签的 ID
    pub fn get(&self, tag: SlotTag) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.tag == tag)
            .map(|e| e.id.as_str())
    }

    /// 指定分区的全部条目
    pub fn for_section(&self, section: FrequencyClass) -> Vec<&TaggedId> {
        self.entries
            .iter()
            .filter(|e| e.tag.section == section)
            .collect()
    }

    /// 规范化格式: 每行 "TAG: id", 以换行连接
    pub fn to_cell_string(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
