use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ledger::{InvoiceReference, PriceObservation, SupplierIdentity};
use crate::models::result::MatchQuality;

/// 发票行匹配状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStatus {
    #[default]
    Pending,
    Matched,
    Unmatched,
    PendingReview,
    Approved,
    Rejected,
    Skipped,
}

impl MatchingStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Matched => "matched",
            Self::Unmatched => "unmatched",
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
        }
    }
}

/// 匹配方式: 精确 / 按置信度分级的模糊匹配 / 人工
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMethod {
    Exact,
    FuzzyHigh,
    FuzzyMedium,
    FuzzyLow,
    FuzzyVeryLow,
    Manual,
}

impl MatchingMethod {
    pub fn from_quality(quality: MatchQuality) -> Self {
        match quality {
            MatchQuality::Exact => Self::Exact,
            MatchQuality::High => Self::FuzzyHigh,
            MatchQuality::Medium => Self::FuzzyMedium,
            MatchQuality::Low => Self::FuzzyLow,
            MatchQuality::VeryLow => Self::FuzzyVeryLow,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::FuzzyHigh => "fuzzy_high",
            Self::FuzzyMedium => "fuzzy_medium",
            Self::FuzzyLow => "fuzzy_low",
            Self::FuzzyVeryLow => "fuzzy_very_low",
            Self::Manual => "manual",
        }
    }
}

/// 发票头 (价格来源)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceHeader {
    pub id: String,
    pub number: String,
    pub date: NaiveDate,
}

/// 发票行上可被本引擎修改的匹配投影
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineMatchProjection {
    pub matching_status: MatchingStatus,
    pub match_confidence: Option<f64>,
    pub matched_catalog_entry_id: Option<Uuid>,
    pub matching_method: Option<MatchingMethod>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

/// 规范化后的发票行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub id: i64,
    pub line_number: u32,
    pub description: String,
    pub quantity: Option<BigDecimal>,
    pub unit_price: Option<BigDecimal>,
    pub currency: Option<String>,
    pub unit_of_measure: Option<String>,
    pub supplier: SupplierIdentity,
    #[serde(default)]
    pub projection: LineMatchProjection,
}

impl InvoiceLineItem {
    pub fn price_observation(&self) -> Option<PriceObservation> {
        self.unit_price.as_ref().map(|price| PriceObservation {
            price: price.clone(),
            currency: self.currency.clone(),
            quantity: self.quantity.clone(),
            unit_of_measure: self.unit_of_measure.clone(),
        })
    }

    pub fn invoice_reference(&self, header: &InvoiceHeader) -> InvoiceReference {
        InvoiceReference {
            invoice_id: header.id.clone(),
            invoice_number: header.number.clone(),
            invoice_date: header.date,
            line_number: self.line_number,
        }
    }
}

/// 一次导入的发票
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedInvoice {
    pub header: InvoiceHeader,
    pub lines: Vec<InvoiceLineItem>,
}

/// 待人工审核时给审核界面的候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSuggestion {
    pub entry_id: Uuid,
    pub description: String,
    pub internal_code: String,
    pub confidence: f64,
}

/// 发给发票更新方的行更新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMatchUpdate {
    pub line_id: i64,
    pub invoice_id: String,
    pub line_number: u32,
    pub matching_status: MatchingStatus,
    pub match_confidence: Option<f64>,
    pub matched_catalog_entry_id: Option<Uuid>,
    pub matching_method: Option<MatchingMethod>,
    pub internal_code: Option<String>,
    pub suggestion: Option<ReviewSuggestion>,
    pub notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl LineMatchUpdate {
    pub fn new(invoice_id: &str, line: &InvoiceLineItem, status: MatchingStatus) -> Self {
        Self {
            line_id: line.id,
            invoice_id: invoice_id.to_string(),
            line_number: line.line_number,
            matching_status: status,
            match_confidence: None,
            matched_catalog_entry_id: None,
            matching_method: None,
            internal_code: None,
            suggestion: None,
            notes: None,
            reviewed_by: None,
            reviewed_at: None,
        }
    }

    pub fn with_match(
        mut self,
        entry_id: Uuid,
        internal_code: &str,
        confidence: Option<f64>,
        method: Option<MatchingMethod>,
    ) -> Self {
        self.matched_catalog_entry_id = Some(entry_id);
        self.internal_code = Some(internal_code.to_string());
        self.match_confidence = confidence;
        self.matching_method = method;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn reviewed(mut self, reviewer: &str, notes: Option<String>) -> Self {
        self.reviewed_by = Some(reviewer.to_string());
        self.reviewed_at = Some(Utc::now());
        if notes.is_some() {
            self.notes = notes;
        }
        self
    }

    /// 投影回发票行
    pub fn apply_to(&self, line: &mut InvoiceLineItem) {
        line.projection = LineMatchProjection {
            matching_status: self.matching_status,
            match_confidence: self.match_confidence,
            matched_catalog_entry_id: self.matched_catalog_entry_id,
            matching_method: self.matching_method,
            reviewed_by: self.reviewed_by.clone(),
            reviewed_at: self.reviewed_at,
            review_notes: self.notes.clone(),
        };
    }
}
