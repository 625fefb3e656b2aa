// ==========================================
// 基础解析引擎集成测试
// ==========================================
// 测试目标: 验证门店解析、日期展开、标签化 ID 编解码、字段校验
// 覆盖范围: 全集/排除/未知门店, 周/月/单次日期, ID 单元格改写, 数值容差
// ==========================================

mod test_helpers;

use promo_reconcile::config::ValidationConfig;
use promo_reconcile::domain::{
    FieldStatus, FrequencyClass, Location, Severity, SlotTag, ValidationField, ValidationRecord,
    Verdict,
};
use promo_reconcile::engine::{DateExpander, FieldValidationEngine, LocationResolver, TaggedIdCodec};
use test_helpers::*;

// ==========================================
// 门店解析
// ==========================================

#[test]
fn test_location_resolution_forms() {
    println!("\n=== 测试：门店文本解析 ===");
    let resolver = LocationResolver::builtin();

    assert!(resolver.resolve("All Locations").is_universe());
    assert!(resolver.resolve("").is_universe());

    let except = resolver.resolve("All Locations Except: Davis, Dixon");
    assert_eq!(except.len(), Location::ALL.len() - 2);
    assert!(!except.contains(Location::Davis));

    let list = resolver.resolve("Davis, Dixon");
    assert_eq!(list.len(), 2);
    assert_eq!(list.names(), vec!["Davis".to_string(), "Dixon".to_string()]);

    println!("✓ 门店解析正确");
}

// ==========================================
// 日期展开
// ==========================================

#[test]
fn test_date_expansion_by_section() {
    println!("\n=== 测试：日期展开 ===");
    let weekly = create_test_spec("Kiva", FrequencyClass::RecurringWeekly, "Monday", 2, "");
    let dates = DateExpander::expand(&weekly, target(3, 2025));
    assert_eq!(
        dates.into_iter().collect::<Vec<_>>(),
        vec![march(3), march(10), march(17), march(24), march(31)]
    );

    let monthly = create_test_spec("Kiva", FrequencyClass::RecurringMonthly, "1st & 15th", 3, "");
    let dates = DateExpander::expand(&monthly, target(3, 2025));
    assert_eq!(dates.into_iter().collect::<Vec<_>>(), vec![march(1), march(15)]);

    let sale = create_test_spec("Kiva", FrequencyClass::OneOffSale, "3/17/2025", 4, "");
    let dates = DateExpander::expand(&sale, target(3, 2025));
    assert_eq!(dates.into_iter().collect::<Vec<_>>(), vec![march(17)]);

    let garbage = create_test_spec("Kiva", FrequencyClass::RecurringWeekly, "Someday", 5, "");
    assert!(DateExpander::expand(&garbage, target(3, 2025)).is_empty());

    println!("✓ 日期展开正确");
}

// ==========================================
// 标签化 ID
// ==========================================

#[test]
fn test_tagged_id_cell_update_keeps_other_lines() {
    println!("\n=== 测试：标签化 ID 单元格 ===");
    let cell = TaggedIdCodec::parse("W1: 100\nW2: 200");
    assert_eq!(cell.get(SlotTag::weekly(1)), Some("100"));
    assert_eq!(cell.get(SlotTag::weekly(2)), Some("200"));

    let updated = TaggedIdCodec::update_cell("W1: 100\nW2: 200", "W1", "150", false);
    assert_eq!(updated, "W1: 150\nW2: 200");

    println!("✓ 只替换目标标签行");
}

// ==========================================
// 字段校验
// ==========================================

fn discount_only(discount: &str) -> ValidationRecord {
    ValidationRecord {
        discount: discount.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_numeric_discount_comparison() {
    println!("\n=== 测试：折扣数值比较 ===");
    let engine = FieldValidationEngine::new(&ValidationConfig::default());

    let results = engine.compare_fields(
        &discount_only("20%"),
        &discount_only("0.20"),
        &[ValidationField::Discount],
    );
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, FieldStatus::Match);

    let results = engine.compare_fields(
        &discount_only("20%"),
        &discount_only("25"),
        &[ValidationField::Discount],
    );
    assert_eq!(results[0].status, FieldStatus::Mismatch);
    assert_eq!(results[0].severity, Severity::Critical);

    let summary = FieldValidationEngine::summarize(results);
    assert_eq!(summary.verdict, Verdict::Fail);

    println!("✓ 百分比/小数换算与容差正确");
}
