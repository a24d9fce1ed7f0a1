use uuid::Uuid;

use crate::db::modify_entry;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    CatalogEntry, InvoiceHeader, InvoiceLineItem, LineMatchUpdate, MatchingMethod, MatchingStatus,
};
use crate::service::engine::MatchingEngine;

/// 只有尚未处理或待审核的行可以人工处理
fn ensure_reviewable(line: &InvoiceLineItem) -> CatalogResult<()> {
    match line.projection.matching_status {
        MatchingStatus::Pending | MatchingStatus::PendingReview => Ok(()),
        status => Err(CatalogError::LineNotReviewable {
            line_id: line.id,
            status: status.as_str(),
        }),
    }
}

impl MatchingEngine {
    /// 审核通过: 把行合并进审核人选定的条目 (通常是导入时给出的建议)
    pub async fn approve_match(
        &self,
        tenant_id: &str,
        header: &InvoiceHeader,
        line: &InvoiceLineItem,
        entry_id: Uuid,
        reviewer: &str,
        notes: Option<String>,
    ) -> CatalogResult<LineMatchUpdate> {
        ensure_reviewable(line)?;

        let entry = self
            .consolidate_line(tenant_id, entry_id, header, line)
            .await?;
        self.register_alternative(tenant_id, entry.id, &line.description, Some(reviewer))
            .await;

        let update = LineMatchUpdate::new(&header.id, line, MatchingStatus::Approved)
            .with_match(
                entry.id,
                entry.internal_code(),
                line.projection.match_confidence,
                Some(MatchingMethod::Manual),
            )
            .reviewed(reviewer, notes);
        self.emit(&update).await?;

        tracing::info!(
            "[Review] {} 确认发票 {} 行 {} 对应条目 {}",
            reviewer,
            header.id,
            line.line_number,
            entry.internal_code()
        );
        Ok(update)
    }

    /// 审核通过: 以该行新建目录条目
    pub async fn approve_new_product(
        &self,
        tenant_id: &str,
        header: &InvoiceHeader,
        line: &InvoiceLineItem,
        reviewer: &str,
        notes: Option<String>,
    ) -> CatalogResult<(CatalogEntry, LineMatchUpdate)> {
        ensure_reviewable(line)?;

        let entry = self
            .create_entry_from_line(tenant_id, header, line, reviewer, notes.clone())
            .await?;

        let update = LineMatchUpdate::new(&header.id, line, MatchingStatus::Approved)
            .with_match(
                entry.id,
                entry.internal_code(),
                None,
                Some(MatchingMethod::Manual),
            )
            .reviewed(reviewer, notes);
        self.emit(&update).await?;

        tracing::info!(
            "[Review] {} 以发票 {} 行 {} 新建条目 {}",
            reviewer,
            header.id,
            line.line_number,
            entry.internal_code()
        );
        Ok((entry, update))
    }

    /// 审核拒绝: 行不进入目录
    pub async fn reject_line(
        &self,
        tenant_id: &str,
        header: &InvoiceHeader,
        line: &InvoiceLineItem,
        reviewer: &str,
        notes: Option<String>,
    ) -> CatalogResult<LineMatchUpdate> {
        ensure_reviewable(line)?;

        let update = LineMatchUpdate::new(&header.id, line, MatchingStatus::Rejected)
            .reviewed(reviewer, notes);
        self.emit(&update).await?;

        tracing::info!(
            "[Review] tenant {} {} 拒绝发票 {} 行 {}",
            tenant_id,
            reviewer,
            header.id,
            line.line_number
        );
        Ok(update)
    }

    /// 审批或拒绝目录条目; 被拒绝的条目不再参与匹配
    pub async fn set_entry_approval(
        &self,
        tenant_id: &str,
        entry_id: Uuid,
        approved: bool,
        reviewer: &str,
        notes: Option<String>,
    ) -> CatalogResult<CatalogEntry> {
        let entry = modify_entry(
            self.repository(),
            tenant_id,
            entry_id,
            self.settings().consolidation_attempts,
            "set entry approval",
            |entry| {
                if approved {
                    entry.approve(reviewer, notes.clone());
                } else {
                    entry.reject(reviewer, notes.clone());
                }
                true
            },
        )
        .await?;

        tracing::info!(
            "[Review] {} 将条目 {} 设为 {}",
            reviewer,
            entry.internal_code(),
            entry.approval_status.as_str()
        );
        Ok(entry)
    }
}
