use crate::models::{DuplicateGroup, ImportReport, ImportedInvoice, MatchType, MatchingMethod, SearchOptions, TenantMatchingConfig};
use crate::service::{find_duplicate_groups, find_similar_products, MatchingEngine};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchingEngine>,
}

/// 请求体: 一批发票 + 本次导入使用的租户配置快照 (缺省为旧模式)
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub config: Option<TenantMatchingConfig>,
    pub invoices: Vec<ImportedInvoice>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    pub reports: Vec<ImportReport>,
}

/// 请求体: 相似商品查询
#[derive(Debug, Deserialize)]
pub struct SimilarRequest {
    pub description: String,
    #[serde(default)]
    pub config: Option<TenantMatchingConfig>,
    pub limit: Option<usize>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CandidateView {
    pub entry_id: Uuid,
    pub internal_code: String,
    pub description: String,
    pub confidence: f64,
    pub matched_text: String,
    pub match_type: MatchType,
    pub method: MatchingMethod,
}

#[derive(Debug, Serialize)]
pub struct SimilarResponse {
    pub success: bool,
    pub candidates: Vec<CandidateView>,
}

#[derive(Debug, Serialize)]
pub struct DuplicatesResponse {
    pub success: bool,
    pub groups: Vec<DuplicateGroup>,
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            message,
        }),
    )
        .into_response()
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 导入发票 (同一租户的多张发票并发处理)
pub async fn import_invoices(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(req): Json<ImportRequest>,
) -> Response {
    if let Some(config) = &req.config {
        if let Err(e) = config.validate() {
            return error_response(StatusCode::BAD_REQUEST, format!("Error: {}", e));
        }
    }

    let reports = state
        .engine
        .import_invoices(&tenant_id, req.config.as_ref(), &req.invoices)
        .await;
    let total_lines: usize = reports.iter().map(|r| r.summary.total_lines).sum();
    let failed: usize = reports.iter().map(|r| r.summary.failed).sum();

    let response = ImportResponse {
        success: failed == 0,
        message: format!(
            "Processed {} invoices, {} lines, {} failed",
            reports.len(),
            total_lines,
            failed
        ),
        reports,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 相似商品查询
pub async fn similar_products(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(req): Json<SimilarRequest>,
) -> Response {
    if let Some(config) = &req.config {
        if let Err(e) = config.validate() {
            return error_response(StatusCode::BAD_REQUEST, format!("Error: {}", e));
        }
    }

    let result = match (req.limit, req.threshold) {
        (None, None) => {
            state
                .engine
                .find_candidates(&tenant_id, req.config.as_ref(), &req.description)
                .await
        }
        (limit, threshold) => {
            let defaults = SearchOptions::default();
            let options = SearchOptions {
                limit: limit.unwrap_or(defaults.limit),
                threshold: threshold.unwrap_or(defaults.threshold),
            };
            find_similar_products(
                state.engine.repository(),
                &tenant_id,
                &req.description,
                &options,
            )
            .await
        }
    };

    match result {
        Ok(candidates) => {
            let candidates = candidates
                .iter()
                .map(|c| CandidateView {
                    entry_id: c.entry.id,
                    internal_code: c.entry.internal_code().to_string(),
                    description: c.entry.description().to_string(),
                    confidence: c.confidence,
                    matched_text: c.matched_text.clone(),
                    match_type: c.match_type,
                    method: c.matching_method(),
                })
                .collect();
            (
                StatusCode::OK,
                Json(SimilarResponse {
                    success: true,
                    candidates,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)),
    }
}

/// 疑似重复条目
pub async fn duplicate_groups(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> Response {
    match find_duplicate_groups(state.engine.repository(), &tenant_id).await {
        Ok(groups) => (
            StatusCode::OK,
            Json(DuplicatesResponse {
                success: true,
                groups,
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)),
    }
}
