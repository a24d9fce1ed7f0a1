mod support;

use catalog_match_rust::models::{
    ApprovalStatus, CatalogEntry, LineOutcome, MatchingMethod, MatchingPhase, MatchingStatus,
    TenantMatchingConfig,
};
use catalog_match_rust::service::{CodeGenerator, SequentialCodeGenerator};
use catalog_match_rust::{export_outcomes_csv, CatalogRepository, InMemoryCatalogRepository};
use std::sync::Arc;
use support::*;

/// 总是给出同一个编码
struct FixedCode(&'static str);

impl CodeGenerator for FixedCode {
    fn generate(&self, _tenant_id: &str, _normalized_description: &str) -> String {
        self.0.to_string()
    }
}

#[tokio::test]
async fn new_product_is_created_then_consolidated_for_another_supplier() {
    let (h, repository) = harness();
    let config = phased_config(0.7, 0.9, false);

    let first = h
        .engine
        .import_invoice(
            TENANT,
            Some(&config),
            &invoice(
                header("inv-1", (2024, 1, 10)),
                vec![line(1, 1, "Widget Pro 500", "10.00", "2", acme())],
            ),
        )
        .await;
    let LineOutcome::Created { entry_id, internal_code } = first.lines[0].outcome.clone() else {
        panic!("expected creation, got {:?}", first.lines[0].outcome);
    };
    assert_eq!(internal_code, "WID-000001");

    let created = repository
        .get_entry(TENANT, entry_id)
        .await
        .expect("read")
        .expect("entry");
    assert_eq!(created.approval_status, ApprovalStatus::Approved);
    assert_eq!(
        created.approval.as_ref().map(|a| a.approved_by.as_str()),
        Some("system")
    );
    let update = h.sink.get(1).expect("line update");
    assert_eq!(update.matching_status, MatchingStatus::Unmatched);
    assert_eq!(update.matched_catalog_entry_id, Some(entry_id));

    let second = h
        .engine
        .import_invoice(
            TENANT,
            Some(&config),
            &invoice(
                header("inv-2", (2024, 2, 3)),
                vec![line(2, 1, "WIDGET PRO 500", "11.50", "1", beta())],
            ),
        )
        .await;
    match &second.lines[0].outcome {
        LineOutcome::Consolidated {
            entry_id: matched,
            confidence,
            method,
            ..
        } => {
            assert_eq!(*matched, entry_id);
            assert!((confidence - 0.98).abs() < 1e-9);
            assert_eq!(*method, MatchingMethod::Exact);
        }
        other => panic!("expected consolidation, got {other:?}"),
    }
    assert_eq!(
        h.sink.get(2).map(|u| u.matching_status),
        Some(MatchingStatus::Matched)
    );

    let entry = repository
        .get_entry(TENANT, entry_id)
        .await
        .expect("read")
        .expect("entry");
    assert_eq!(repository.entry_count(TENANT), 1);
    assert_eq!(entry.supplier_ledgers().count(), 2);
    for supplier in [acme(), beta()] {
        let ledger = entry.supplier_ledger(&supplier).expect("ledger per supplier");
        assert_eq!(ledger.price_history().len(), 1);
    }
    assert_eq!(
        entry.alternative("widget pro 500").map(|a| a.frequency),
        Some(2)
    );
}

#[tokio::test]
async fn non_product_lines_are_skipped_without_touching_the_catalog() {
    let (h, repository) = harness();

    let report = h
        .engine
        .import_invoice(
            TENANT,
            None,
            &invoice(
                header("inv-1", (2024, 3, 1)),
                vec![
                    line(1, 1, "VITE M6X20 ACCIAIO INOX — 100 PZ", "0.05", "100", acme()),
                    line(2, 2, "Contributo ambientale CONAI assolto ove dovuto", "0", "1", acme()),
                    line(3, 3, "   ", "0", "0", acme()),
                ],
            ),
        )
        .await;

    assert_eq!(report.summary.total_lines, 3);
    assert_eq!(report.summary.created, 1);
    assert_eq!(report.summary.skipped, 2);
    assert_eq!(repository.entry_count(TENANT), 1);

    let skipped = h.sink.get(2).expect("skip update");
    assert_eq!(skipped.matching_status, MatchingStatus::Skipped);
    assert!(skipped
        .notes
        .as_deref()
        .is_some_and(|n| n.contains("environmental fee")));
    assert!(skipped.matched_catalog_entry_id.is_none());
}

#[tokio::test]
async fn exact_match_below_auto_approve_goes_to_review_when_required() {
    let (h, repository) = harness();
    let seeded = repository
        .insert_entry(&CatalogEntry::new(TENANT, "WID-000100", "Widget Pro 500"))
        .await
        .expect("seed");
    let config = TenantMatchingConfig {
        phase1: MatchingPhase {
            enabled: true,
            confidence_threshold: 0.7,
            auto_approve_above: 0.99,
            require_manual_review: true,
        },
        ..Default::default()
    };

    let report = h
        .engine
        .import_invoice(
            TENANT,
            Some(&config),
            &invoice(
                header("inv-1", (2024, 3, 1)),
                vec![line(7, 1, "widget pro 500", "10", "1", acme())],
            ),
        )
        .await;

    match &report.lines[0].outcome {
        LineOutcome::PendingReview {
            suggestion: Some(suggestion),
            ..
        } => {
            assert_eq!(suggestion.entry_id, seeded.id);
            assert_eq!(suggestion.internal_code, "WID-000100");
        }
        other => panic!("expected review with suggestion, got {other:?}"),
    }

    let update = h.sink.get(7).expect("line update");
    assert_eq!(update.matching_status, MatchingStatus::PendingReview);
    assert_eq!(update.suggestion.map(|s| s.entry_id), Some(seeded.id));
    // 审核前不记录价格
    let entry = repository
        .get_entry(TENANT, seeded.id)
        .await
        .expect("read")
        .expect("entry");
    assert_eq!(entry.supplier_ledgers().count(), 0);
}

#[tokio::test]
async fn new_products_wait_for_approval_when_tenant_requires_it() {
    let (h, repository) = harness();
    let config = phased_config(0.7, 0.9, true);

    let report = h
        .engine
        .import_invoice(
            TENANT,
            Some(&config),
            &invoice(
                header("inv-1", (2024, 3, 1)),
                vec![line(1, 1, "Guanti nitrile taglia M", "4.20", "10", acme())],
            ),
        )
        .await;

    assert!(matches!(
        report.lines[0].outcome,
        LineOutcome::PendingReview {
            suggestion: None,
            ..
        }
    ));
    assert_eq!(repository.entry_count(TENANT), 0);
}

#[tokio::test]
async fn code_clash_is_retried_with_a_fresh_code() {
    let repository = Arc::new(InMemoryCatalogRepository::new());
    repository
        .insert_entry(&CatalogEntry::new(TENANT, "WID-000001", "Guanti nitrile taglia M"))
        .await
        .expect("seed");
    let h = harness_with(
        repository.clone(),
        Arc::new(SequentialCodeGenerator::default()),
    );

    let report = h
        .engine
        .import_invoice(
            TENANT,
            None,
            &invoice(
                header("inv-1", (2024, 3, 1)),
                vec![line(1, 1, "Widget Pro 500", "10", "1", acme())],
            ),
        )
        .await;

    match &report.lines[0].outcome {
        LineOutcome::Created { internal_code, .. } => assert_eq!(internal_code, "WID-000002"),
        other => panic!("expected creation, got {other:?}"),
    }
    assert_eq!(repository.entry_count(TENANT), 2);
}

#[tokio::test]
async fn exhausted_code_retries_fail_only_that_line() {
    let repository = Arc::new(InMemoryCatalogRepository::new());
    repository
        .insert_entry(&CatalogEntry::new(TENANT, "ZZZ-000001", "Guanti nitrile taglia M"))
        .await
        .expect("seed");
    let h = harness_with(repository.clone(), Arc::new(FixedCode("ZZZ-000001")));

    let report = h
        .engine
        .import_invoice(
            TENANT,
            None,
            &invoice(
                header("inv-1", (2024, 3, 1)),
                vec![
                    line(1, 1, "Widget Pro 500", "10", "1", acme()),
                    line(2, 2, "guanti nitrile taglia m", "4.20", "10", acme()),
                ],
            ),
        )
        .await;

    match &report.lines[0].outcome {
        LineOutcome::Failed { error } => assert!(error.contains("create catalog entry")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(
        report.lines[1].outcome,
        LineOutcome::Consolidated { .. }
    ));
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.consolidated, 1);
}

#[tokio::test]
async fn reimporting_an_invoice_never_duplicates_prices() {
    let (h, repository) = harness();
    let mut inv = invoice(
        header("inv-1", (2024, 3, 1)),
        vec![line(1, 1, "Widget Pro 500", "10", "1", acme())],
    );

    let first = h.engine.import_invoice(TENANT, None, &inv).await;
    let LineOutcome::Created { entry_id, .. } = first.lines[0].outcome.clone() else {
        panic!("expected creation");
    };

    // 重试: 行状态仍为 pending, 匹配到刚建的条目但不重复记价
    let retry = h.engine.import_invoice(TENANT, None, &inv).await;
    assert!(matches!(
        retry.lines[0].outcome,
        LineOutcome::Consolidated { .. }
    ));
    let entry = repository
        .get_entry(TENANT, entry_id)
        .await
        .expect("read")
        .expect("entry");
    let ledger = entry.supplier_ledger(&acme()).expect("ledger");
    assert_eq!(ledger.price_history().len(), 1);

    // 回写过状态的行直接跳过
    let update = h.sink.get(1).expect("update");
    update.apply_to(&mut inv.lines[0]);
    let third = h.engine.import_invoice(TENANT, None, &inv).await;
    assert_eq!(
        third.lines[0].outcome,
        LineOutcome::AlreadyProcessed {
            status: MatchingStatus::Matched
        }
    );
}

#[tokio::test]
async fn batch_import_keeps_invoice_order() {
    let (h, _) = harness();
    let invoices: Vec<_> = (1..=4)
        .map(|i| {
            invoice(
                header(&format!("inv-{i}"), (2024, 4, i)),
                vec![line(i as i64, 1, &format!("Articolo catalogo {i} conf 6 pz"), "3", "6", acme())],
            )
        })
        .collect();

    let reports = h.engine.import_invoices(TENANT, None, &invoices).await;

    let ids: Vec<_> = reports.iter().map(|r| r.invoice_id.as_str()).collect();
    assert_eq!(ids, vec!["inv-1", "inv-2", "inv-3", "inv-4"]);
    assert!(reports.iter().all(|r| r.summary.failed == 0));
}

#[tokio::test]
async fn outcomes_export_to_csv() {
    let (h, _) = harness();
    let report = h
        .engine
        .import_invoice(
            TENANT,
            None,
            &invoice(
                header("inv-1", (2024, 3, 1)),
                vec![
                    line(1, 1, "Widget Pro 500", "10", "1", acme()),
                    line(2, 2, "Contributo ambientale CONAI assolto ove dovuto", "0", "1", acme()),
                ],
            ),
        )
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("outcomes.csv");
    export_outcomes_csv(&[report], &path).expect("export");

    let mut reader = csv::Reader::from_path(&path).expect("open csv");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][3], "created");
    assert_eq!(&rows[0][5], "WID-000001");
    assert_eq!(&rows[1][3], "skipped");
}
