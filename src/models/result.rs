use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::catalog::CatalogEntry;
use crate::models::invoice::{MatchingMethod, MatchingStatus, ReviewSuggestion};

/// 候选命中方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Fuzzy,
}

/// 置信度分级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    Exact,
    High,
    Medium,
    Low,
    VeryLow,
}

impl MatchQuality {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.95 {
            Self::Exact
        } else if confidence >= 0.8 {
            Self::High
        } else if confidence >= 0.6 {
            Self::Medium
        } else if confidence >= 0.4 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::VeryLow => "very_low",
        }
    }
}

/// 检索参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub limit: usize,
    pub threshold: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            threshold: 0.5,
        }
    }
}

/// 相似商品候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarProduct {
    pub entry: CatalogEntry,
    pub confidence: f64,
    pub matched_text: String,
    pub match_type: MatchType,
}

impl SimilarProduct {
    pub fn matching_method(&self) -> MatchingMethod {
        match self.match_type {
            MatchType::Exact => MatchingMethod::Exact,
            MatchType::Fuzzy => MatchingMethod::from_quality(MatchQuality::from_confidence(self.confidence)),
        }
    }

    pub fn suggestion(&self) -> ReviewSuggestion {
        ReviewSuggestion {
            entry_id: self.entry.id,
            description: self.entry.description().to_string(),
            internal_code: self.entry.internal_code().to_string(),
            confidence: self.confidence,
        }
    }
}

/// 阶段决策的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    LegacyMatched,
    LegacyUnmatched,
    AboveAutoApprove,
    BelowConfidenceThreshold,
    ManualReviewRequired,
    WithinThresholds,
    MatchingPhaseDisabled,
    NewProductNeedsApproval,
    NewProductAutoCreate,
    NewProductPhaseDisabled,
}

impl DecisionReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LegacyMatched => "no tenant configuration, match accepted",
            Self::LegacyUnmatched => "no tenant configuration, new entry created",
            Self::AboveAutoApprove => "confidence above auto-approve level",
            Self::BelowConfidenceThreshold => "confidence below matching threshold",
            Self::ManualReviewRequired => "tenant requires manual review of fuzzy matches",
            Self::WithinThresholds => "confidence within accepted range",
            Self::MatchingPhaseDisabled => "matching phase disabled, match accepted",
            Self::NewProductNeedsApproval => "new products require approval",
            Self::NewProductAutoCreate => "new product created automatically",
            Self::NewProductPhaseDisabled => "new product phase disabled, entry created",
        }
    }
}

/// 阶段决策结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDecision {
    pub status: MatchingStatus,
    pub requires_review: bool,
    pub auto_approved: bool,
    pub reason: DecisionReason,
}

/// 单行处理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LineOutcome {
    Skipped {
        reason: String,
    },
    AlreadyProcessed {
        status: MatchingStatus,
    },
    Consolidated {
        entry_id: Uuid,
        internal_code: String,
        confidence: f64,
        method: MatchingMethod,
    },
    Created {
        entry_id: Uuid,
        internal_code: String,
    },
    PendingReview {
        suggestion: Option<ReviewSuggestion>,
        reason: String,
    },
    Failed {
        error: String,
    },
}

impl LineOutcome {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Skipped { .. } => "skipped",
            Self::AlreadyProcessed { .. } => "already_processed",
            Self::Consolidated { .. } => "consolidated",
            Self::Created { .. } => "created",
            Self::PendingReview { .. } => "pending_review",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineReport {
    pub line_id: i64,
    pub line_number: u32,
    pub description: String,
    pub outcome: LineOutcome,
}

/// 单张发票导入统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_lines: usize,
    pub consolidated: usize,
    pub created: usize,
    pub pending_review: usize,
    pub skipped: usize,
    pub already_processed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub tenant_id: String,
    pub invoice_id: String,
    pub lines: Vec<LineReport>,
    pub summary: ImportSummary,
}

impl ImportReport {
    pub fn new(tenant_id: &str, invoice_id: &str, lines: Vec<LineReport>) -> Self {
        let mut summary = ImportSummary {
            total_lines: lines.len(),
            ..ImportSummary::default()
        };
        for line in &lines {
            match line.outcome {
                LineOutcome::Skipped { .. } => summary.skipped += 1,
                LineOutcome::AlreadyProcessed { .. } => summary.already_processed += 1,
                LineOutcome::Consolidated { .. } => summary.consolidated += 1,
                LineOutcome::Created { .. } => summary.created += 1,
                LineOutcome::PendingReview { .. } => summary.pending_review += 1,
                LineOutcome::Failed { .. } => summary.failed += 1,
            }
        }

        Self {
            tenant_id: tenant_id.to_string(),
            invoice_id: invoice_id.to_string(),
            lines,
            summary,
        }
    }
}

/// 规范化描述相同的条目组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub normalized_description: String,
    pub entry_ids: Vec<Uuid>,
    pub internal_codes: Vec<String>,
}
