// ==========================================
// MatchScorer 引擎集成测试
// ==========================================
// 测试目标: 验证计划表记录与外部系统快照的匹配结论
// 覆盖范围: 标签确认 / 自动选中 / 候选建议 / 无可信匹配 / 多品牌拆分
// ==========================================

mod test_helpers;

use promo_reconcile::config::{OverrideTables, ScoringConfig};
use promo_reconcile::domain::{FrequencyClass, MatchStatus};
use promo_reconcile::engine::{MatchScorer, Resolution};
use test_helpers::*;

#[test]
fn test_match_all_resolutions() {
    println!("\n=== 测试：匹配结论分级 ===");
    let config = ScoringConfig::default();
    let tables = OverrideTables::default();
    let scorer = MatchScorer::new(&config, &tables);

    let snapshot = create_test_snapshot(vec![
        create_test_external(1, "Kiva", "Monday", None, None),
        create_test_external(2, "Wyld", "Friday", None, None),
    ]);

    let mut suggested = create_test_spec("Wyld", FrequencyClass::RecurringWeekly, "Friday", 4, "");
    suggested.discount = "30%".to_string();

    let specs = vec![
        create_test_spec("Kiva", FrequencyClass::RecurringWeekly, "Monday", 2, "")
            .with_external_id_cell("W1: 777"),
        create_test_spec("Kiva", FrequencyClass::RecurringWeekly, "Monday", 3, ""),
        suggested,
        create_test_spec("Wyld", FrequencyClass::RecurringWeekly, "Tuesday", 5, ""),
    ];

    let outcomes = scorer.match_all(&specs, &snapshot).unwrap();
    assert_eq!(outcomes.len(), 4);

    // 单元格已有 ID
    assert_eq!(outcomes[0].resolution, Resolution::ConfirmedByTag);
    assert_eq!(outcomes[0].selected_id, Some(777));

    // 完全一致 → 100 分自动选中
    assert_eq!(outcomes[1].status, MatchStatus::High);
    assert_eq!(outcomes[1].resolution, Resolution::AutoSelected);
    assert_eq!(outcomes[1].selected_id, Some(1));

    // 折扣不一致 → 70 分, 只给建议
    assert_eq!(outcomes[2].status, MatchStatus::Medium);
    assert_eq!(outcomes[2].selected_id, None);
    assert_eq!(outcomes[2].suggestions[0].external_id, 2);
    assert_eq!(outcomes[2].suggestions[0].score, 70);

    // 周几无交集 → 无候选
    assert_eq!(outcomes[3].status, MatchStatus::Low);
    assert!(outcomes[3].suggestions.is_empty());

    println!("✓ 四种匹配结论正确");
}

#[test]
fn test_multi_brand_row_scores_each_brand() {
    println!("\n=== 测试：多品牌行 ===");
    let config = ScoringConfig::default();
    let tables = OverrideTables::default();
    let scorer = MatchScorer::new(&config, &tables);

    let snapshot = create_test_snapshot(vec![
        create_test_external(10, "Kiva", "Monday", None, None),
        create_test_external(11, "Papa & Barkley", "Monday", None, None),
    ]);
    let spec = create_test_spec(
        "Kiva, Papa & Barkley",
        FrequencyClass::RecurringWeekly,
        "Monday",
        6,
        "",
    );

    let outcomes = scorer.match_all(&[spec], &snapshot).unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].brand, "Kiva");
    assert_eq!(outcomes[0].selected_id, Some(10));
    assert_eq!(outcomes[1].brand, "Papa & Barkley");
    assert_eq!(outcomes[1].selected_id, Some(11));

    println!("✓ 每个品牌独立匹配");
}

#[test]
fn test_missing_brand_is_rejected() {
    let config = ScoringConfig::default();
    let tables = OverrideTables::default();
    let scorer = MatchScorer::new(&config, &tables);
    let spec = create_test_spec("  ", FrequencyClass::OneOffSale, "3/17/2025", 9, "");
    assert!(scorer.match_all(&[spec], &create_test_snapshot(vec![])).is_err());
}
