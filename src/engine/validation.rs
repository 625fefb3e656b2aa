// ==========================================
// 促销日历对账系统 - 字段校验引擎
// ==========================================
// 职责: 计划表值 vs 外部系统值 的逐字段比较与总体结论
// 红线: 严重度来自静态规则表, 不在比较逻辑中散落
// ==========================================

use crate::config::ValidationConfig;
use crate::domain::types::{FieldStatus, Severity, Verdict};
use crate::domain::validation::{
    FieldResult, FieldValue, ValidationField, ValidationRecord, ValidationSummary,
};
use crate::engine::date_expander::DateExpander;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// 视为"未填写"的目标值
const BLANK_TOKENS: &[&str] = &["", "none", "nan", "n/a", "-", "null"];

// ==========================================
// 比较方式 / 规则表
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Scalar,     // 忽略大小写的字符串比较
    Numeric,    // 百分比/数值, 带容差
    Date,       // 规范化为 ISO 后比较
    StringSet,  // 无序集合
    WeekdaySet, // 周几集合（别名归一）
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: ValidationField,
    pub severity: Severity,
    pub comparator: Comparator,
    pub skip_when_source_blank: bool, // 计划表未填写时不校验
}

/// 字段 → 严重度/比较方式
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: ValidationField::Discount,
        severity: Severity::Critical,
        comparator: Comparator::Numeric,
        skip_when_source_blank: false,
    },
    FieldRule {
        field: ValidationField::VendorContribution,
        severity: Severity::Critical,
        comparator: Comparator::Numeric,
        skip_when_source_blank: false,
    },
    FieldRule {
        field: ValidationField::Brand,
        severity: Severity::Critical,
        comparator: Comparator::Scalar,
        skip_when_source_blank: false,
    },
    FieldRule {
        field: ValidationField::Locations,
        severity: Severity::Critical,
        comparator: Comparator::StringSet,
        skip_when_source_blank: false,
    },
    FieldRule {
        field: ValidationField::StartDate,
        severity: Severity::Critical,
        comparator: Comparator::Date,
        skip_when_source_blank: true,
    },
    FieldRule {
        field: ValidationField::EndDate,
        severity: Severity::Critical,
        comparator: Comparator::Date,
        skip_when_source_blank: true,
    },
    FieldRule {
        field: ValidationField::ActiveDays,
        severity: Severity::Advisory,
        comparator: Comparator::WeekdaySet,
        skip_when_source_blank: true,
    },
    FieldRule {
        field: ValidationField::Categories,
        severity: Severity::Advisory,
        comparator: Comparator::StringSet,
        skip_when_source_blank: true,
    },
    FieldRule {
        field: ValidationField::RebateType,
        severity: Severity::Advisory,
        comparator: Comparator::Scalar,
        skip_when_source_blank: true,
    },
];

/// 查找字段规则
pub fn rule_for(field: ValidationField) -> Option<&'static FieldRule> {
    FIELD_RULES.iter().find(|r| r.field == field)
}

// ==========================================
// FieldValidationEngine - 字段校验引擎
// ==========================================
pub struct FieldValidationEngine {
    tolerance: f64,
}

impl FieldValidationEngine {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            tolerance: config.numeric_tolerance,
        }
    }

    /// 按规则表比较全部字段
    pub fn compare(
        &self,
        source: &ValidationRecord,
        target: &ValidationRecord,
    ) -> Vec<FieldResult> {
        self.compare_rules(source, target, FIELD_RULES.iter())
    }

    /// 仅比较指定字段
    pub fn compare_fields(
        &self,
        source: &ValidationRecord,
        target: &ValidationRecord,
        fields: &[ValidationField],
    ) -> Vec<FieldResult> {
        self.compare_rules(
            source,
            target,
            FIELD_RULES.iter().filter(|r| fields.contains(&r.field)),
        )
    }

    /// 比较并汇总
    #[instrument(skip(self, source, target), fields(brand = %source.brand))]
    pub fn validate(
        &self,
        source: &ValidationRecord,
        target: &ValidationRecord,
    ) -> ValidationSummary {
        let summary = Self::summarize(self.compare(source, target));
        debug!(
            verdict = %summary.verdict,
            critical = summary.critical_issues,
            advisory = summary.advisory_issues,
            "字段校验完成"
        );
        summary
    }

    fn compare_rules<'r>(
        &self,
        source: &ValidationRecord,
        target: &ValidationRecord,
        rules: impl Iterator<Item = &'r FieldRule>,
    ) -> Vec<FieldResult> {
        rules
            .filter_map(|rule| {
                let src = source.value(rule.field);
                let tgt = target.value(rule.field);
                if rule.skip_when_source_blank && is_blankish(&src) {
                    return None;
                }
                Some(self.compare_one(rule, src, tgt))
            })
            .collect()
    }

    fn compare_one(&self, rule: &FieldRule, source: FieldValue, target: FieldValue) -> FieldResult {
        let mut result = FieldResult {
            field: rule.field,
            severity: rule.severity,
            status: FieldStatus::Match,
            source_value: source.clone(),
            target_value: target.clone(),
            message: String::new(),
            added: Vec::new(),
            removed: Vec::new(),
        };

        if is_blankish(&source) && is_blankish(&target) {
            result.message = "双方均未填写".to_string();
            return result;
        }
        if is_blankish(&target) {
            result.status = FieldStatus::Missing;
            result.message = format!("外部系统缺少 {}", rule.field);
            return result;
        }

        match rule.comparator {
            Comparator::Numeric => self.compare_numeric(&mut result),
            Comparator::Scalar => compare_scalar(&mut result),
            Comparator::Date => compare_date(&mut result),
            Comparator::StringSet => compare_set(&mut result, normalize_item),
            Comparator::WeekdaySet => compare_set(&mut result, normalize_weekday),
        }
        result
    }

    fn compare_numeric(&self, result: &mut FieldResult) {
        let source = result.source_value.as_text();
        let target = result.target_value.as_text();

        let Some(src) = parse_numeric(&source) else {
            // 计划表值无法解析 → 退回字符串比较
            compare_scalar(result);
            return;
        };

        match parse_numeric(&target) {
            Some(tgt) if (src - tgt).abs() <= self.tolerance => {
                result.message = format!("{} ≈ {}", src, tgt);
            }
            Some(tgt) => {
                result.status = FieldStatus::Mismatch;
                result.message = format!("期望 {}, 实际 {}", src, tgt);
            }
            None => {
                result.status = FieldStatus::Mismatch;
                result.message = format!("期望 {}, 外部值无法解析: {}", src, target);
            }
        }
    }

    /// 汇总: 有 CRITICAL 问题 → FAIL; 仅 ADVISORY 问题 → WARN; 否则 PASS
    pub fn summarize(results: Vec<FieldResult>) -> ValidationSummary {
        let critical_issues = results
            .iter()
            .filter(|r| r.is_issue() && r.severity == Severity::Critical)
            .count();
        let advisory_issues = results
            .iter()
            .filter(|r| r.is_issue() && r.severity == Severity::Advisory)
            .count();

        let verdict = if critical_issues > 0 {
            Verdict::Fail
        } else if advisory_issues > 0 {
            Verdict::Warn
        } else {
            Verdict::Pass
        };

        ValidationSummary {
            verdict,
            total_fields: results.len(),
            critical_issues,
            advisory_issues,
            results,
        }
    }
}

fn compare_scalar(result: &mut FieldResult) {
    let source = result.source_value.as_text();
    let target = result.target_value.as_text();
    if source.trim().eq_ignore_ascii_case(target.trim()) {
        result.status = FieldStatus::Match;
        result.message = String::new();
    } else {
        result.status = FieldStatus::Mismatch;
        result.message = format!("期望 '{}', 实际 '{}'", source.trim(), target.trim());
    }
}

fn compare_date(result: &mut FieldResult) {
    let source = normalize_date(&result.source_value.as_text());
    let target = normalize_date(&result.target_value.as_text());
    if source == target {
        result.message = source;
    } else {
        result.status = FieldStatus::Mismatch;
        result.message = format!("期望 {}, 实际 {}", source, target);
    }
}

fn compare_set(result: &mut FieldResult, normalize: fn(&str) -> String) {
    let source = items(&result.source_value);
    let target = items(&result.target_value);

    let source_keys: BTreeSet<String> = source.iter().map(|s| normalize(s)).collect();
    let target_keys: BTreeSet<String> = target.iter().map(|s| normalize(s)).collect();

    if source_keys == target_keys {
        return;
    }

    result.status = FieldStatus::Mismatch;
    result.added = target
        .iter()
        .filter(|t| !source_keys.contains(&normalize(t)))
        .cloned()
        .collect();
    result.removed = source
        .iter()
        .filter(|s| !target_keys.contains(&normalize(s)))
        .cloned()
        .collect();
    result.message = format!("多出 {:?}, 缺少 {:?}", result.added, result.removed);
}

fn items(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::List(list) => list
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        FieldValue::Text(text) => text
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}

fn normalize_item(item: &str) -> String {
    item.trim().to_lowercase()
}

fn normalize_weekday(item: &str) -> String {
    match DateExpander::parse_weekday(item) {
        Some(day) => day.to_string(),
        None => normalize_item(item),
    }
}

fn is_blankish(value: &FieldValue) -> bool {
    match value {
        FieldValue::Text(s) => BLANK_TOKENS.contains(&s.trim().to_lowercase().as_str()),
        FieldValue::List(list) => list
            .iter()
            .all(|s| BLANK_TOKENS.contains(&s.trim().to_lowercase().as_str())),
    }
}

/// 数值解析: "20%", "20% off", "0.20", "$5" → 20 / 20 / 20 / 5
///
/// # 规则
/// - 去掉 off / discount 字样, 只保留数字、一个小数点、前导负号
/// - 不带 % 且 0 < x < 1 → 视为小数比例, ×100
pub fn parse_numeric(text: &str) -> Option<f64> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    let has_percent = lower.contains('%');
    let stripped = lower.replace("off", "").replace("discount", "");

    let mut cleaned = String::new();
    let mut seen_dot = false;
    for c in stripped.trim().chars() {
        match c {
            '0'..='9' => cleaned.push(c),
            '.' if !seen_dot => {
                seen_dot = true;
                cleaned.push(c);
            }
            '-' if cleaned.is_empty() => cleaned.push(c),
            _ => {}
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    if !has_percent && value > 0.0 && value < 1.0 {
        return Some((value * 100.0 * 1e6).round() / 1e6);
    }
    Some(value)
}

/// 日期规范化: 可解析 → ISO, 否则原样
pub fn normalize_date(text: &str) -> String {
    match DateExpander::parse_date(text) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => text.trim().to_string(),
    }
}
