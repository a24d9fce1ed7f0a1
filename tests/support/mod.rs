#![allow(dead_code)]

use bigdecimal::BigDecimal;
use catalog_match_rust::models::{
    ImportedInvoice, InvoiceHeader, InvoiceLineItem, MatchingPhase, NewProductPhase,
    SupplierIdentity, TenantMatchingConfig,
};
use catalog_match_rust::service::{CodeGenerator, SequentialCodeGenerator};
use catalog_match_rust::{
    CatalogRepository, InMemoryCatalogRepository, InMemoryLineUpdateSink, MatchingEngine,
    MatchingSettings,
};
use chrono::NaiveDate;
use std::str::FromStr;
use std::sync::Arc;

pub const TENANT: &str = "tenant-a";

pub fn acme() -> SupplierIdentity {
    SupplierIdentity::new("IT01234567890", "ACME S.p.A.")
}

pub fn beta() -> SupplierIdentity {
    SupplierIdentity::new("IT09876543210", "Beta Forniture srl")
}

pub fn header(id: &str, date: (i32, u32, u32)) -> InvoiceHeader {
    InvoiceHeader {
        id: id.to_string(),
        number: format!("FT-{id}"),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid date"),
    }
}

pub fn line(
    id: i64,
    line_number: u32,
    description: &str,
    unit_price: &str,
    quantity: &str,
    supplier: SupplierIdentity,
) -> InvoiceLineItem {
    InvoiceLineItem {
        id,
        line_number,
        description: description.to_string(),
        quantity: Some(BigDecimal::from_str(quantity).expect("quantity")),
        unit_price: Some(BigDecimal::from_str(unit_price).expect("price")),
        currency: Some("EUR".to_string()),
        unit_of_measure: Some("PZ".to_string()),
        supplier,
        projection: Default::default(),
    }
}

pub fn invoice(header: InvoiceHeader, lines: Vec<InvoiceLineItem>) -> ImportedInvoice {
    ImportedInvoice { header, lines }
}

/// 阶段1 + 阶段2 均启用的租户配置
pub fn phased_config(
    threshold: f64,
    auto_approve_above: f64,
    require_approval_for_new: bool,
) -> TenantMatchingConfig {
    TenantMatchingConfig {
        phase1: MatchingPhase {
            enabled: true,
            confidence_threshold: threshold,
            auto_approve_above,
            require_manual_review: false,
        },
        phase2: NewProductPhase {
            enabled: true,
            require_approval_for_new,
        },
        ..Default::default()
    }
}

pub struct Harness {
    pub engine: Arc<MatchingEngine>,
    pub sink: Arc<InMemoryLineUpdateSink>,
}

pub fn harness_with(
    repository: Arc<dyn CatalogRepository>,
    codes: Arc<dyn CodeGenerator>,
) -> Harness {
    let sink = Arc::new(InMemoryLineUpdateSink::new());
    let engine = MatchingEngine::new(repository, sink.clone(), MatchingSettings::default())
        .with_code_generator(codes);
    Harness {
        engine: Arc::new(engine),
        sink,
    }
}

pub fn harness() -> (Harness, Arc<InMemoryCatalogRepository>) {
    let repository = Arc::new(InMemoryCatalogRepository::new());
    let harness = harness_with(
        repository.clone(),
        Arc::new(SequentialCodeGenerator::default()),
    );
    (harness, repository)
}
