// ==========================================
// 促销日历对账系统 - 字段校验结果
// ==========================================

use crate::domain::types::{FieldStatus, Severity, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ValidationField - 参与校验的字段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationField {
    Discount,
    VendorContribution,
    Brand,
    Locations,
    StartDate,
    EndDate,
    ActiveDays,
    Categories,
    RebateType,
}

impl ValidationField {
    pub fn name(&self) -> &'static str {
        match self {
            ValidationField::Discount => "discount",
            ValidationField::VendorContribution => "vendor_contribution",
            ValidationField::Brand => "brand",
            ValidationField::Locations => "locations",
            ValidationField::StartDate => "start_date",
            ValidationField::EndDate => "end_date",
            ValidationField::ActiveDays => "active_days",
            ValidationField::Categories => "categories",
            ValidationField::RebateType => "rebate_type",
        }
    }
}

impl fmt::Display for ValidationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ==========================================
// FieldValue - 字段值（标量或集合）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(", "),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

// ==========================================
// ValidationRecord - 校验输入
// ==========================================
// 计划表侧与外部系统侧各构造一份
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub discount: String,
    pub vendor_contribution: String,
    pub brand: String,
    pub locations: Vec<String>,
    pub start_date: String,
    pub end_date: String,
    pub active_days: Vec<String>,
    pub categories: Vec<String>,
    pub rebate_type: String,
}

impl ValidationRecord {
    pub fn value(&self, field: ValidationField) -> FieldValue {
        match field {
            ValidationField::Discount => FieldValue::Text(self.discount.clone()),
            ValidationField::VendorContribution => {
                FieldValue::Text(self.vendor_contribution.clone())
            }
            ValidationField::Brand => FieldValue::Text(self.brand.clone()),
            ValidationField::Locations => FieldValue::List(self.locations.clone()),
            ValidationField::StartDate => FieldValue::Text(self.start_date.clone()),
            ValidationField::EndDate => FieldValue::Text(self.end_date.clone()),
            ValidationField::ActiveDays => FieldValue::List(self.active_days.clone()),
            ValidationField::Categories => FieldValue::List(self.categories.clone()),
            ValidationField::RebateType => FieldValue::Text(self.rebate_type.clone()),
        }
    }
}

// ==========================================
// FieldResult - 单字段校验结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResult {
    pub field: ValidationField,
    pub severity: Severity,
    pub status: FieldStatus,
    pub source_value: FieldValue,
    pub target_value: FieldValue,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<String>, // 集合比较: 目标多出
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<String>, // 集合比较: 目标缺少
}

impl FieldResult {
    pub fn is_issue(&self) -> bool {
        self.status != FieldStatus::Match
    }
}

// ==========================================
// ValidationSummary - 汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub verdict: Verdict,
    pub total_fields: usize,
    pub critical_issues: usize,
    pub advisory_issues: usize,
    pub results: Vec<FieldResult>,
}
