use crate::models::{DecisionReason, MatchingStatus, PhaseDecision, TenantMatchingConfig};

fn accepted(status: MatchingStatus, reason: DecisionReason) -> PhaseDecision {
    PhaseDecision {
        status,
        requires_review: false,
        auto_approved: true,
        reason,
    }
}

fn review(reason: DecisionReason) -> PhaseDecision {
    PhaseDecision {
        status: MatchingStatus::PendingReview,
        requires_review: true,
        auto_approved: false,
        reason,
    }
}

/// 阶段决策: (最佳候选置信度 或 无候选, 租户配置) -> 结果
///
/// 纯函数, 对任意输入恰好给出一个结果. `best_confidence` 为 `None` 表示没有候选.
pub fn decide(best_confidence: Option<f64>, config: Option<&TenantMatchingConfig>) -> PhaseDecision {
    let Some(config) = config else {
        return match best_confidence {
            Some(_) => accepted(MatchingStatus::Matched, DecisionReason::LegacyMatched),
            None => accepted(MatchingStatus::Unmatched, DecisionReason::LegacyUnmatched),
        };
    };

    match best_confidence {
        Some(confidence) if config.phase1.enabled => {
            let phase1 = &config.phase1;
            if confidence >= phase1.auto_approve_above {
                accepted(MatchingStatus::Matched, DecisionReason::AboveAutoApprove)
            } else if confidence < phase1.confidence_threshold {
                review(DecisionReason::BelowConfidenceThreshold)
            } else if phase1.require_manual_review {
                review(DecisionReason::ManualReviewRequired)
            } else {
                accepted(MatchingStatus::Matched, DecisionReason::WithinThresholds)
            }
        }
        Some(_) => accepted(MatchingStatus::Matched, DecisionReason::MatchingPhaseDisabled),
        None if config.phase2.enabled => {
            if config.phase2.require_approval_for_new {
                review(DecisionReason::NewProductNeedsApproval)
            } else {
                accepted(MatchingStatus::Unmatched, DecisionReason::NewProductAutoCreate)
            }
        }
        None => accepted(MatchingStatus::Unmatched, DecisionReason::NewProductPhaseDisabled),
    }
}
