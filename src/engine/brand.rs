// ==========================================
// 促销日历对账系统 - 品牌处理
// ==========================================
// 职责: 多品牌拆分、品牌覆写、多品牌行的 品牌↔ID 配对
// ==========================================

use crate::config::OverrideTables;
use crate::domain::deal::ExternalSnapshot;
use crate::domain::tagged_id::{TaggedId, TaggedIdCell};
use crate::engine::similarity::{is_containment, token_set_ratio};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 名称中本身带 "&" 的品牌, 拆分时不切开
const AMPERSAND_BRANDS: &[&str] = &["papa & barkley", "hash & flowers"];

/// 多品牌文本拆分
///
/// # 规则
/// - 以逗号、"/"、" & " 分隔
/// - 已知带 & 的品牌整体保留
/// - 去重, 保持首次出现顺序
pub fn parse_multi_brand(text: &str) -> Vec<String> {
    let mut brands: Vec<String> = Vec::new();

    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let pieces: Vec<&str> = if AMPERSAND_BRANDS.contains(&part.to_lowercase().as_str()) {
            vec![part]
        } else {
            part.split('/')
                .flat_map(|p| p.split(" & "))
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .collect()
        };

        for piece in pieces {
            if !brands.iter().any(|b| b.eq_ignore_ascii_case(piece)) {
                brands.push(piece.to_string());
            }
        }
    }

    brands
}

/// 用于匹配的品牌名: 覆写表优先（精确 → 大小写不敏感）, 否则原样
pub fn resolve_brand_for_match(brand: &str, tables: &OverrideTables) -> String {
    tables
        .brand_override(brand)
        .map(|s| s.to_string())
        .unwrap_or_else(|| brand.trim().to_string())
}

// ==========================================
// 品牌 ↔ ID 配对
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairingMethod {
    ExactBrand,   // 外部记录品牌精确一致
    FuzzyBrand,   // 外部记录品牌高相似度（排除包含关系）
    SlotPosition, // 按标签槽位序号对应第 N 个品牌
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandIdPair {
    pub brand: String,
    pub tagged: TaggedId,
    pub method: PairingMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandIdPairing {
    pub paired: Vec<BrandIdPair>,
    pub unmatched: Vec<TaggedId>,
}

impl BrandIdPairing {
    /// 指定品牌的全部 ID
    pub fn ids_for(&self, brand: &str) -> Vec<&TaggedId> {
        self.paired
            .iter()
            .filter(|p| p.brand.eq_ignore_ascii_case(brand))
            .map(|p| &p.tagged)
            .collect()
    }
}

/// 多品牌行的 品牌↔ID 配对
///
/// # 规则
/// 1. 外部记录品牌（经覆写）与某个品牌精确一致
/// 2. 相似度 >= threshold 且不是包含关系
/// 3. 标签槽位序号 N → 第 N 个品牌（补丁槽位按条目顺序）
/// 4. 仍无法配对 → unmatched
pub fn pair_ids_to_brands(
    cell: &TaggedIdCell,
    brands: &[String],
    snapshot: &ExternalSnapshot,
    tables: &OverrideTables,
    threshold: u8,
) -> BrandIdPairing {
    let mut pairing = BrandIdPairing::default();

    for (index, entry) in cell.entries().iter().enumerate() {
        let external_brand = snapshot.get_by_text(&entry.id).map(|r| r.brand.trim().to_string());

        let by_record = external_brand.as_deref().and_then(|ext| {
            brands
                .iter()
                .find(|b| resolve_brand_for_match(b, tables).eq_ignore_ascii_case(ext))
                .map(|b| (b.clone(), PairingMethod::ExactBrand))
                .or_else(|| {
                    brands
                        .iter()
                        .map(|b| (b, resolve_brand_for_match(b, tables)))
                        .filter(|(_, resolved)| !is_containment(resolved, ext))
                        .map(|(b, resolved)| (b, token_set_ratio(&resolved, ext)))
                        .filter(|(_, score)| *score >= threshold)
                        .max_by_key(|(_, score)| *score)
                        .map(|(b, _)| (b.clone(), PairingMethod::FuzzyBrand))
                })
        });

        let position = entry.tag.position().unwrap_or(index + 1);
        let resolved = by_record.or_else(|| {
            brands
                .get(position.saturating_sub(1))
                .map(|b| (b.clone(), PairingMethod::SlotPosition))
        });

        match resolved {
            Some((brand, method)) => {
                debug!(id = %entry.id, brand = %brand, method = ?method, "品牌ID配对");
                pairing.paired.push(BrandIdPair {
                    brand,
                    tagged: entry.clone(),
                    method,
                });
            }
            None => pairing.unmatched.push(entry.clone()),
        }
    }

    pairing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deal::ExternalRecord;
    use crate::domain::tagged_id::SlotTag;
    use crate::domain::types::FrequencyClass;

    #[test]
    fn test_parse_multi_brand() {
        assert_eq!(parse_multi_brand("Kiva, Camino"), vec!["Kiva", "Camino"]);
        assert_eq!(parse_multi_brand("Kiva / Camino"), vec!["Kiva", "Camino"]);
        assert_eq!(parse_multi_brand("Kiva & Camino"), vec!["Kiva", "Camino"]);
        assert_eq!(
            parse_multi_brand("Papa & Barkley, Hash & Flowers"),
            vec!["Papa & Barkley", "Hash & Flowers"]
        );
        assert_eq!(parse_multi_brand("Wyld, wyld"), vec!["Wyld"]);
        assert!(parse_multi_brand(" , ").is_empty());
    }

    #[test]
    fn test_resolve_brand_for_match() {
        let mut tables = OverrideTables::default();
        tables
            .brand_overrides
            .insert("Kiva".to_string(), "Kiva Confections".to_string());
        assert_eq!(resolve_brand_for_match("kiva", &tables), "Kiva Confections");
        assert_eq!(resolve_brand_for_match(" Wyld ", &tables), "Wyld");
    }

    #[test]
    fn test_pairing_prefers_record_brand_over_position() {
        let snapshot = ExternalSnapshot::new(vec![
            ExternalRecord::new(966, "Camino"),
            ExternalRecord::new(967, "Kiva"),
        ]);
        let cell = TaggedIdCell::new(vec![
            TaggedId::new(SlotTag::part(FrequencyClass::OneOffSale, 1), "966"),
            TaggedId::new(SlotTag::part(FrequencyClass::OneOffSale, 2), "967"),
            TaggedId::new(SlotTag::part(FrequencyClass::OneOffSale, 3), "968"),
        ]);
        let brands = vec!["Kiva".to_string(), "Camino".to_string()];

        let pairing =
            pair_ids_to_brands(&cell, &brands, &snapshot, &OverrideTables::default(), 95);

        assert_eq!(pairing.ids_for("Camino")[0].id, "966");
        assert_eq!(pairing.ids_for("Kiva")[0].id, "967");
        assert_eq!(pairing.paired[0].method, PairingMethod::ExactBrand);
        // 968 不在快照中, 槽位 3 超出品牌数
        assert_eq!(pairing.unmatched.len(), 1);
        assert_eq!(pairing.unmatched[0].id, "968");
    }

    #[test]
    fn test_pairing_falls_back_to_slot_position() {
        let snapshot = ExternalSnapshot::default();
        let cell = TaggedIdCell::new(vec![
            TaggedId::new(SlotTag::weekly(1), "1"),
            TaggedId::new(SlotTag::weekly(2), "2"),
        ]);
        let brands = vec!["Kiva".to_string(), "Camino".to_string()];
        let pairing =
            pair_ids_to_brands(&cell, &brands, &snapshot, &OverrideTables::default(), 95);
        assert_eq!(pairing.ids_for("Kiva")[0].id, "1");
        assert_eq!(pairing.ids_for("Camino")[0].id, "2");
        assert!(pairing
            .paired
            .iter()
            .all(|p| p.method == PairingMethod::SlotPosition));
    }

    #[test]
    fn test_pairing_skips_containment_fuzzy() {
        // "Kiva Bars" 包含 "Kiva", 不能走模糊配对, 退回槽位
        let snapshot = ExternalSnapshot::new(vec![ExternalRecord::new(5, "Kiva Bars")]);
        let cell = TaggedIdCell::new(vec![TaggedId::new(SlotTag::weekly(2), "5")]);
        let brands = vec!["Kiva".to_string(), "Camino".to_string()];
        let pairing =
            pair_ids_to_brands(&cell, &brands, &snapshot, &OverrideTables::default(), 95);
        assert_eq!(pairing.paired[0].brand, "Camino");
        assert_eq!(pairing.paired[0].method, PairingMethod::SlotPosition);
    }
}
