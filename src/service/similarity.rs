use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::db::CatalogRepository;
use crate::error::CatalogResult;
use crate::models::{
    ApprovalStatus, CatalogEntry, MatchQuality, MatchType, SearchOptions, SimilarProduct,
};
use crate::service::normalizer::normalize_description;

/// 规范化描述完全相同时的置信度
pub const EXACT_MATCH_CONFIDENCE: f64 = 0.98;
/// 模糊匹配的置信度上限, 保证精确匹配排在前面
const FUZZY_CONFIDENCE_CEILING: f64 = 0.97;
/// 原始得分下限, 低于此值直接丢弃
const RAW_SCORE_FLOOR: f64 = -1000.0;
/// 子串命中时每个多余字符的扣分
const SUBSTRING_GAP_PENALTY: f64 = 8.0;
/// 非子串时相似度缺口的放大系数
const DISSIMILARITY_SCALE: f64 = 1600.0;
/// 非子串时每个长度差字符的扣分
const LENGTH_GAP_PENALTY: f64 = 2.0;

/// 原始对齐得分: 0 为完全一致, 越低越差, 无下界
fn raw_alignment_score(query: &str, target: &str) -> f64 {
    if query.is_empty() || target.is_empty() {
        return f64::NEG_INFINITY;
    }

    let length_gap = (target.chars().count() as f64 - query.chars().count() as f64).abs();
    if contains_phrase(target, query) {
        return -(length_gap * SUBSTRING_GAP_PENALTY);
    }

    let similarity = 0.3 * token_overlap(query, target)
        + 0.4 * jaro_winkler(query, target)
        + 0.3 * normalized_levenshtein(query, target);
    -(1.0 - similarity) * DISSIMILARITY_SCALE - length_gap * LENGTH_GAP_PENALTY
}

/// `phrase` 的完整词序列是否出现在 `text` 中
///
/// 只检查查询落在目标内; 目标是查询的一部分时走相似度混合打分.
fn contains_phrase(text: &str, phrase: &str) -> bool {
    format!(" {text} ").contains(&format!(" {phrase} "))
}

/// 词集合的 Jaccard 系数
fn token_overlap(query: &str, target: &str) -> f64 {
    let left: HashSet<&str> = query.split_whitespace().collect();
    let right: HashSet<&str> = target.split_whitespace().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// 原始得分 -> [0,1] 置信度; 低于下限返回 None
fn confidence_from_raw(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw < RAW_SCORE_FLOOR {
        return None;
    }
    let rescaled = (raw - RAW_SCORE_FLOOR) / -RAW_SCORE_FLOOR;
    Some(rescaled.clamp(0.0, FUZZY_CONFIDENCE_CEILING))
}

/// 两个已规范化文本的模糊置信度
pub fn fuzzy_confidence(normalized_query: &str, normalized_target: &str) -> Option<f64> {
    confidence_from_raw(raw_alignment_score(normalized_query, normalized_target))
}

/// 置信度分级
pub fn matching_method(confidence: f64) -> MatchQuality {
    MatchQuality::from_confidence(confidence)
}

struct Scored {
    position: usize,
    confidence: f64,
    matched_text: String,
    match_type: MatchType,
}

fn score_entry(position: usize, entry: &CatalogEntry, query: &str) -> Option<Scored> {
    if entry.approval_status == ApprovalStatus::Rejected {
        return None;
    }

    if let Some((text, _)) = entry.match_texts().find(|(_, normalized)| *normalized == query) {
        return Some(Scored {
            position,
            confidence: EXACT_MATCH_CONFIDENCE,
            matched_text: text.to_string(),
            match_type: MatchType::Exact,
        });
    }

    entry
        .match_texts()
        .filter_map(|(text, normalized)| {
            fuzzy_confidence(query, normalized).map(|confidence| (text, confidence))
        })
        .fold(None::<(&str, f64)>, |best, (text, confidence)| match best {
            Some((_, current)) if current >= confidence => best,
            _ => Some((text, confidence)),
        })
        .map(|(text, confidence)| Scored {
            position,
            confidence,
            matched_text: text.to_string(),
            match_type: MatchType::Fuzzy,
        })
}

fn rank_order(a: &Scored, b: &Scored) -> Ordering {
    let exact = |s: &Scored| s.match_type == MatchType::Exact;
    exact(b)
        .cmp(&exact(a))
        .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal))
        .then_with(|| a.position.cmp(&b.position))
}

/// 在一个租户目录快照上排序候选
///
/// `entries` 需按创建顺序给出, 同分时先创建者优先.
pub fn rank_candidates(
    entries: &[CatalogEntry],
    description: &str,
    options: &SearchOptions,
) -> Vec<SimilarProduct> {
    let query = normalize_description(description);
    if query.is_empty() || options.limit == 0 {
        return Vec::new();
    }

    let mut scored: Vec<Scored> = entries
        .par_iter()
        .enumerate()
        .filter_map(|(position, entry)| score_entry(position, entry, &query))
        .filter(|s| s.confidence >= options.threshold)
        .collect();

    scored.sort_by(rank_order);
    scored.truncate(options.limit);

    scored
        .into_iter()
        .map(|s| SimilarProduct {
            entry: entries[s.position].clone(),
            confidence: s.confidence,
            matched_text: s.matched_text,
            match_type: s.match_type,
        })
        .collect()
}

/// 全量扫描租户目录查找相似商品 (只读, 代价与目录规模线性相关)
pub async fn find_similar_products(
    repository: &dyn CatalogRepository,
    tenant_id: &str,
    description: &str,
    options: &SearchOptions,
) -> CatalogResult<Vec<SimilarProduct>> {
    let entries = repository.list_entries(tenant_id).await?;
    let ranked = rank_candidates(&entries, description, options);
    tracing::debug!(
        "[Catalog] tenant {}: {} 条目中找到 {} 个候选 ({:?})",
        tenant_id,
        entries.len(),
        ranked.len(),
        description
    );
    Ok(ranked)
}
