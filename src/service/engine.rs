use futures::future::join_all;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::MatchingSettings;
use crate::db::{modify_entry, CatalogRepository, LineUpdateSink};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    CatalogEntry, DescriptionProvenance, ImportReport, ImportedInvoice, InvoiceHeader,
    InvoiceLineItem, LineMatchUpdate, LineOutcome, LineReport, MatchingStatus, SearchOptions,
    SimilarProduct, TenantMatchingConfig,
};
use crate::service::alternatives::add_alternative_description;
use crate::service::codes::{CodeGenerator, RandomCodeGenerator};
use crate::service::decision::decide;
use crate::service::filter::classify_line;
use crate::service::ledger::add_price_entry;
use crate::service::similarity::find_similar_products;

/// 自动创建条目时记录的审批人
pub const SYSTEM_APPROVER: &str = "system";

/// 发票行匹配与价格合并引擎
///
/// 每张发票的行按顺序处理; 多张发票可并发导入, 对同一条目的写入由仓储的
/// 版本校验串行化.
pub struct MatchingEngine {
    repository: Arc<dyn CatalogRepository>,
    sink: Arc<dyn LineUpdateSink>,
    codes: Arc<dyn CodeGenerator>,
    settings: MatchingSettings,
}

impl MatchingEngine {
    pub fn new(
        repository: Arc<dyn CatalogRepository>,
        sink: Arc<dyn LineUpdateSink>,
        settings: MatchingSettings,
    ) -> Self {
        Self {
            repository,
            sink,
            codes: Arc::new(RandomCodeGenerator),
            settings,
        }
    }

    pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    pub fn repository(&self) -> &dyn CatalogRepository {
        self.repository.as_ref()
    }

    pub fn settings(&self) -> &MatchingSettings {
        &self.settings
    }

    /// 导入一张发票: 逐行处理, 单行失败不影响其他行
    pub async fn import_invoice(
        &self,
        tenant_id: &str,
        config: Option<&TenantMatchingConfig>,
        invoice: &ImportedInvoice,
    ) -> ImportReport {
        let header = &invoice.header;
        tracing::info!(
            "[Import] tenant {} 发票 {} ({}) 开始处理, 共 {} 行",
            tenant_id,
            header.id,
            header.number,
            invoice.lines.len()
        );

        let mut lines = Vec::with_capacity(invoice.lines.len());
        for line in &invoice.lines {
            let outcome = self.process_line(tenant_id, config, header, line).await;
            lines.push(LineReport {
                line_id: line.id,
                line_number: line.line_number,
                description: line.description.clone(),
                outcome,
            });
        }

        let report = ImportReport::new(tenant_id, &header.id, lines);
        let s = &report.summary;
        tracing::info!(
            "[Import] 发票 {} 完成: 合并 {}, 新建 {}, 待审核 {}, 跳过 {}, 已处理 {}, 失败 {}",
            header.id,
            s.consolidated,
            s.created,
            s.pending_review,
            s.skipped,
            s.already_processed,
            s.failed
        );
        report
    }

    /// 并发导入同一租户的多张发票, 结果与输入顺序一致
    pub async fn import_invoices(
        &self,
        tenant_id: &str,
        config: Option<&TenantMatchingConfig>,
        invoices: &[ImportedInvoice],
    ) -> Vec<ImportReport> {
        join_all(
            invoices
                .iter()
                .map(|invoice| self.import_invoice(tenant_id, config, invoice)),
        )
        .await
    }

    /// 只读查询候选 (与导入使用相同的阈值规则)
    pub async fn find_candidates(
        &self,
        tenant_id: &str,
        config: Option<&TenantMatchingConfig>,
        description: &str,
    ) -> CatalogResult<Vec<SimilarProduct>> {
        find_similar_products(
            self.repository.as_ref(),
            tenant_id,
            description,
            &self.search_options(config),
        )
        .await
    }

    fn search_options(&self, config: Option<&TenantMatchingConfig>) -> SearchOptions {
        let threshold = match config {
            Some(c) if c.phase1.enabled => {
                self.settings.review_floor.min(c.phase1.confidence_threshold)
            }
            _ => self.settings.legacy_threshold,
        };
        SearchOptions {
            limit: self.settings.search_limit,
            threshold,
        }
    }

    async fn process_line(
        &self,
        tenant_id: &str,
        config: Option<&TenantMatchingConfig>,
        header: &InvoiceHeader,
        line: &InvoiceLineItem,
    ) -> LineOutcome {
        match self.try_process_line(tenant_id, config, header, line).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    "[Import] tenant {} 发票 {} 行 {} 处理失败: {}",
                    tenant_id,
                    header.id,
                    line.line_number,
                    err
                );
                LineOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn try_process_line(
        &self,
        tenant_id: &str,
        config: Option<&TenantMatchingConfig>,
        header: &InvoiceHeader,
        line: &InvoiceLineItem,
    ) -> CatalogResult<LineOutcome> {
        let current = line.projection.matching_status;
        if current != MatchingStatus::Pending {
            tracing::debug!(
                "[Import] 发票 {} 行 {} 状态为 {}, 跳过",
                header.id,
                line.line_number,
                current.as_str()
            );
            return Ok(LineOutcome::AlreadyProcessed { status: current });
        }

        let verdict = classify_line(line);
        if let Some(note) = verdict.skip_note() {
            tracing::info!(
                "[Import] 发票 {} 行 {} 非商品行: {:?}",
                header.id,
                line.line_number,
                line.description
            );
            self.sink
                .apply_line_update(
                    &LineMatchUpdate::new(&header.id, line, MatchingStatus::Skipped)
                        .with_notes(note.clone()),
                )
                .await?;
            return Ok(LineOutcome::Skipped { reason: note });
        }

        let candidates = self
            .find_candidates(tenant_id, config, &line.description)
            .await?;
        let best = candidates.into_iter().next();
        let decision = decide(best.as_ref().map(|c| c.confidence), config);
        let reason = decision.reason.as_str().to_string();

        if decision.requires_review {
            let suggestion = best.as_ref().map(SimilarProduct::suggestion);
            let mut update = LineMatchUpdate::new(&header.id, line, MatchingStatus::PendingReview)
                .with_notes(reason.clone());
            if let Some(best) = &best {
                update.match_confidence = Some(best.confidence);
                update.matching_method = Some(best.matching_method());
            }
            update.suggestion = suggestion.clone();
            self.sink.apply_line_update(&update).await?;

            tracing::info!(
                "[Review] 发票 {} 行 {} 待人工审核: {}",
                header.id,
                line.line_number,
                reason
            );
            return Ok(LineOutcome::PendingReview { suggestion, reason });
        }

        match best {
            Some(best) => {
                let entry = self
                    .consolidate_line(tenant_id, best.entry.id, header, line)
                    .await?;
                self.register_alternative(tenant_id, entry.id, &line.description, None)
                    .await;

                let method = best.matching_method();
                self.sink
                    .apply_line_update(
                        &LineMatchUpdate::new(&header.id, line, MatchingStatus::Matched)
                            .with_match(
                                entry.id,
                                entry.internal_code(),
                                Some(best.confidence),
                                Some(method),
                            )
                            .with_notes(reason),
                    )
                    .await?;

                tracing::info!(
                    "[Import] 发票 {} 行 {} 合并到 {} (置信度 {:.3}, {})",
                    header.id,
                    line.line_number,
                    entry.internal_code(),
                    best.confidence,
                    method.as_str()
                );
                Ok(LineOutcome::Consolidated {
                    entry_id: entry.id,
                    internal_code: entry.internal_code().to_string(),
                    confidence: best.confidence,
                    method,
                })
            }
            None => {
                let entry = self
                    .create_entry_from_line(tenant_id, header, line, SYSTEM_APPROVER, None)
                    .await?;
                self.sink
                    .apply_line_update(
                        &LineMatchUpdate::new(&header.id, line, MatchingStatus::Unmatched)
                            .with_match(entry.id, entry.internal_code(), None, None)
                            .with_notes(reason),
                    )
                    .await?;

                tracing::info!(
                    "[Import] 发票 {} 行 {} 新建目录条目 {}",
                    header.id,
                    line.line_number,
                    entry.internal_code()
                );
                Ok(LineOutcome::Created {
                    entry_id: entry.id,
                    internal_code: entry.internal_code().to_string(),
                })
            }
        }
    }

    /// 把发票行价格合并进条目, 版本冲突时重新读取后重试
    ///
    /// 同一 (发票, 行号) 已在该供应商账本中时不再追加. 行上没有单价时只校验条目存在.
    pub(crate) async fn consolidate_line(
        &self,
        tenant_id: &str,
        entry_id: Uuid,
        header: &InvoiceHeader,
        line: &InvoiceLineItem,
    ) -> CatalogResult<CatalogEntry> {
        let Some(observation) = line.price_observation() else {
            tracing::debug!(
                "[Ledger] 发票 {} 行 {} 无单价, 不记录价格",
                header.id,
                line.line_number
            );
            return self
                .repository
                .get_entry(tenant_id, entry_id)
                .await?
                .ok_or(CatalogError::EntryNotFound(entry_id));
        };
        let reference = line.invoice_reference(header);

        modify_entry(
            self.repository.as_ref(),
            tenant_id,
            entry_id,
            self.settings.consolidation_attempts,
            "consolidate price",
            |entry| {
                let recorded = entry.supplier_ledger(&line.supplier).is_some_and(|ledger| {
                    ledger.contains_invoice_line(&reference.invoice_id, reference.line_number)
                });
                if recorded {
                    tracing::info!(
                        "[Ledger] 条目 {} 已记录发票 {} 行 {}, 不重复追加",
                        entry.internal_code(),
                        reference.invoice_id,
                        reference.line_number
                    );
                    return false;
                }
                add_price_entry(entry, &line.supplier, &observation, &reference);
                true
            },
        )
        .await
    }

    /// 以发票行新建已审批条目, 编码冲突时换新编码重试 (至少重试一次)
    pub(crate) async fn create_entry_from_line(
        &self,
        tenant_id: &str,
        header: &InvoiceHeader,
        line: &InvoiceLineItem,
        approved_by: &str,
        notes: Option<String>,
    ) -> CatalogResult<CatalogEntry> {
        let mut entry = CatalogEntry::new(tenant_id, "", &line.description);
        entry.reassign_code(
            self.codes
                .generate(tenant_id, entry.normalized_description()),
        );
        entry.approve(approved_by, notes);
        if let Some(observation) = line.price_observation() {
            add_price_entry(
                &mut entry,
                &line.supplier,
                &observation,
                &line.invoice_reference(header),
            );
        }

        let attempts = self.settings.create_attempts.max(2);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.repository.insert_entry(&entry).await {
                Ok(stored) => return Ok(stored),
                Err(err @ CatalogError::DuplicateCode { .. }) => {
                    tracing::warn!(
                        "[Catalog] tenant {} 编码 {} 已存在, 第 {}/{} 次",
                        tenant_id,
                        entry.internal_code(),
                        attempt,
                        attempts
                    );
                    last_error = Some(err);
                    if attempt < attempts {
                        let code = self
                            .codes
                            .generate(tenant_id, entry.normalized_description());
                        entry.reassign_code(code);
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(CatalogError::RetriesExhausted {
            operation: "create catalog entry",
            attempts,
            last: Box::new(last_error.unwrap_or(CatalogError::DuplicateCode {
                tenant_id: tenant_id.to_string(),
                code: entry.internal_code().to_string(),
            })),
        })
    }

    /// 别名登记失败只记日志, 不影响已完成的价格合并
    pub(crate) async fn register_alternative(
        &self,
        tenant_id: &str,
        entry_id: Uuid,
        description: &str,
        added_by: Option<&str>,
    ) {
        let provenance = match added_by {
            Some(_) => DescriptionProvenance::Manual,
            None => DescriptionProvenance::Invoice,
        };
        if let Err(err) = add_alternative_description(
            self.repository.as_ref(),
            tenant_id,
            entry_id,
            description,
            provenance,
            added_by,
            self.settings.consolidation_attempts,
        )
        .await
        {
            tracing::warn!(
                "[Catalog] 条目 {} 别名 {:?} 登记失败: {}",
                entry_id,
                description,
                err
            );
        }
    }

    pub(crate) async fn emit(&self, update: &LineMatchUpdate) -> CatalogResult<()> {
        self.sink.apply_line_update(update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryCatalogRepository, InMemoryLineUpdateSink};
    use crate::models::{MatchingPhase, NewProductPhase, SupplierIdentity};
    use crate::service::codes::SequentialCodeGenerator;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn engine() -> (MatchingEngine, Arc<InMemoryLineUpdateSink>) {
        let sink = Arc::new(InMemoryLineUpdateSink::new());
        let engine = MatchingEngine::new(
            Arc::new(InMemoryCatalogRepository::new()),
            sink.clone(),
            MatchingSettings::default(),
        )
        .with_code_generator(Arc::new(SequentialCodeGenerator::default()));
        (engine, sink)
    }

    fn invoice(id: &str, description: &str, price: &str) -> ImportedInvoice {
        ImportedInvoice {
            header: InvoiceHeader {
                id: id.to_string(),
                number: format!("N-{id}"),
                date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
            },
            lines: vec![InvoiceLineItem {
                id: 1,
                line_number: 1,
                description: description.to_string(),
                quantity: Some(BigDecimal::from(2)),
                unit_price: Some(BigDecimal::from_str(price).expect("price")),
                currency: None,
                unit_of_measure: Some("PZ".to_string()),
                supplier: SupplierIdentity::new("IT01234567890", "ACME S.p.A."),
                projection: Default::default(),
            }],
        }
    }

    #[test]
    fn search_floor_depends_on_matching_phase() {
        let (engine, _) = engine();
        assert!((engine.search_options(None).threshold - 0.7).abs() < 1e-9);

        let config = TenantMatchingConfig {
            phase1: MatchingPhase {
                enabled: true,
                confidence_threshold: 0.4,
                ..Default::default()
            },
            phase2: NewProductPhase::default(),
            ..Default::default()
        };
        assert!((engine.search_options(Some(&config)).threshold - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn legacy_mode_creates_then_consolidates() {
        let (engine, sink) = engine();

        let first = engine
            .import_invoice("t1", None, &invoice("inv-1", "Widget Pro 500", "10.00"))
            .await;
        let LineOutcome::Created { entry_id, .. } = &first.lines[0].outcome else {
            panic!("expected creation, got {:?}", first.lines[0].outcome);
        };
        assert_eq!(
            sink.get(1).map(|u| u.matching_status),
            Some(MatchingStatus::Unmatched)
        );

        let second = engine
            .import_invoice("t1", None, &invoice("inv-2", "widget pro 500", "12.00"))
            .await;
        match &second.lines[0].outcome {
            LineOutcome::Consolidated {
                entry_id: matched,
                confidence,
                ..
            } => {
                assert_eq!(matched, entry_id);
                assert!((confidence - 0.98).abs() < 1e-9);
            }
            other => panic!("expected consolidation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_entry_is_reported_as_failed_line() {
        let (engine, _) = engine();
        let header = invoice("inv-1", "Widget", "1.00").header;
        let line = invoice("inv-1", "Widget", "1.00").lines.remove(0);

        let result = engine
            .consolidate_line("t1", Uuid::new_v4(), &header, &line)
            .await;
        assert!(matches!(result, Err(CatalogError::EntryNotFound(_))));
    }
}
