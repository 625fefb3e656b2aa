// ==========================================
// 促销日历对账系统 - 门店与门店集合
// ==========================================
// 职责: 固定门店全集、门店集合的集合运算与展示格式
// 红线: 集合成员只能是全集内门店; 未识别文本仅保留用于展示
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ==========================================
// Location - 门店
// ==========================================
// 声明顺序即展示名字母序, BTreeSet 迭代顺序与展示顺序一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "Beverly Hills")]
    BeverlyHills,
    #[serde(rename = "Davis")]
    Davis,
    #[serde(rename = "Dixon")]
    Dixon,
    #[serde(rename = "El Sobrante")]
    ElSobrante,
    #[serde(rename = "Fresno (Palm)")]
    FresnoPalm,
    #[serde(rename = "Fresno (Shaw)")]
    FresnoShaw,
    #[serde(rename = "Hawthorne")]
    Hawthorne,
    #[serde(rename = "Koreatown")]
    Koreatown,
    #[serde(rename = "Laguna Woods")]
    LagunaWoods,
    #[serde(rename = "Oxnard")]
    Oxnard,
    #[serde(rename = "Riverside")]
    Riverside,
    #[serde(rename = "West Hollywood")]
    WestHollywood,
}

impl Location {
    /// 门店全集
    pub const ALL: [Location; 12] = [
        Location::BeverlyHills,
        Location::Davis,
        Location::Dixon,
        Location::ElSobrante,
        Location::FresnoPalm,
        Location::FresnoShaw,
        Location::Hawthorne,
        Location::Koreatown,
        Location::LagunaWoods,
        Location::Oxnard,
        Location::Riverside,
        Location::WestHollywood,
    ];

    /// 标准展示名
    pub fn display_name(&self) -> &'static str {
        match self {
            Location::BeverlyHills => "Beverly Hills",
            Location::Davis => "Davis",
            Location::Dixon => "Dixon",
            Location::ElSobrante => "El Sobrante",
            Location::FresnoPalm => "Fresno (Palm)",
            Location::FresnoShaw => "Fresno (Shaw)",
            Location::Hawthorne => "Hawthorne",
            Location::Koreatown => "Koreatown",
            Location::LagunaWoods => "Laguna Woods",
            Location::Oxnard => "Oxnard",
            Location::Riverside => "Riverside",
            Location::WestHollywood => "West Hollywood",
        }
    }

    /// 按标准展示名查找（大小写不敏感）
    pub fn from_canonical(name: &str) -> Option<Location> {
        let needle = name.trim();
        Location::ALL
            .iter()
            .copied()
            .find(|loc| loc.display_name().eq_ignore_ascii_case(needle))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ==========================================
// LocationSet - 门店集合
// ==========================================
// 相等性只比较成员; unknown 仅用于展示与日志
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationSet {
    members: BTreeSet<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    unknown: Vec<String>,
}

impl PartialEq for LocationSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for LocationSet {}

impl LocationSet {
    /// 全部门店
    pub fn universe() -> Self {
        Self {
            members: Location::ALL.iter().copied().collect(),
            unknown: Vec::new(),
        }
    }

    /// 空集合（仅作为集合运算的中间结果出现）
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_members<I>(members: I) -> Self
    where
        I: IntoIterator<Item = Location>,
    {
        Self {
            members: members.into_iter().collect(),
            unknown: Vec::new(),
        }
    }

    /// 附带未识别的原始文本
    pub fn with_unknown(mut self, unknown: Vec<String>) -> Self {
        self.unknown = unknown;
        self
    }

    pub fn members(&self) -> &BTreeSet<Location> {
        &self.members
    }

    pub fn unknown_tokens(&self) -> &[String] {
        &self.unknown
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_universe(&self) -> bool {
        self.members.len() == Location::ALL.len()
    }

    pub fn contains(&self, location: Location) -> bool {
        self.members.contains(&location)
    }

    pub fn intersection(&self, other: &LocationSet) -> LocationSet {
        LocationSet::from_members(self.members.intersection(&other.members).copied())
    }

    pub fn union(&self, other: &LocationSet) -> LocationSet {
        LocationSet::from_members(self.members.union(&other.members).copied())
    }

    pub fn difference(&self, other: &LocationSet) -> LocationSet {
        LocationSet::from_members(self.members.difference(&other.members).copied())
    }

    pub fn is_subset(&self, other: &LocationSet) -> bool {
        self.members.is_subset(&other.members)
    }

    pub fn is_disjoint(&self, other: &LocationSet) -> bool {
        self.members.is_disjoint(&other.members)
    }

    /// 标准展示名列表（字母序）
    pub fn names(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|loc| loc.display_name().to_string())
            .collect()
    }

    /// 展示格式
    ///
    /// # 规则
    /// - 全集 → "All Locations"
    /// - 排除的门店少于保留的门店 → "All Locations Except: A, B"
    /// - 否则 → 逗号分隔的门店列表
    /// - 空集 → "-"
    pub fn display(&self) -> String {
        if self.members.is_empty() {
            return "-".to_string();
        }
        if self.is_universe() {
            return "All Locations".to_string();
        }

        let excluded = LocationSet::universe().difference(self);
        if excluded.len() < self.members.len() {
            return format!("All Locations Except: {}", excluded.names().join(", "));
        }

        self.names().join(", ")
    }
}

impl fmt::Display for LocationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}
