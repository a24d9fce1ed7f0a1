use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;

use crate::models::{
    CatalogEntry, InvoiceReference, PriceObservation, PriceRecord, SupplierIdentity,
    SupplierPriceLedger, DEFAULT_CURRENCY,
};

/// 平均价保留的小数位
const AVERAGE_PRICE_SCALE: i64 = 2;

/// 向目录条目追加一条价格观测
///
/// 按供应商税号定位账本 (不存在则新建), 追加记录后只重算该供应商的派生价格.
/// 该函数只修改内存中的条目, 整体落库由仓储的乐观并发写保证原子性.
pub fn add_price_entry(
    entry: &mut CatalogEntry,
    supplier: &SupplierIdentity,
    observation: &PriceObservation,
    reference: &InvoiceReference,
) {
    let record = PriceRecord {
        price: observation.price.clone(),
        currency: observation
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_uppercase(),
        quantity: observation
            .quantity
            .clone()
            .unwrap_or_else(|| BigDecimal::from(1)),
        unit_of_measure: observation.unit_of_measure.clone(),
        source_invoice_id: reference.invoice_id.clone(),
        source_invoice_number: reference.invoice_number.clone(),
        source_invoice_date: reference.invoice_date,
        source_line_number: reference.line_number,
        observed_at: Utc::now(),
    };

    tracing::debug!(
        "[Ledger] 条目 {} 供应商 {}: 追加价格 {} (发票 {} 行 {})",
        entry.internal_code(),
        supplier.fiscal_id,
        record.price,
        reference.invoice_number,
        reference.line_number
    );

    let ledger = entry
        .supplier_ledgers
        .entry(supplier.ledger_key())
        .or_insert_with(|| SupplierPriceLedger::new(supplier.clone()));
    ledger.price_history.push(record);
    recompute_derived_prices(ledger);
    entry.updated_at = Utc::now();
}

/// 由价格历史重算当前价/均价/最优价
pub fn recompute_derived_prices(ledger: &mut SupplierPriceLedger) {
    let history = &ledger.price_history;
    if history.is_empty() {
        ledger.current_price = None;
        ledger.average_price = None;
        ledger.best_price = None;
        ledger.last_invoice_date = None;
        return;
    }

    // 同一发票日期时后追加的记录胜出
    let latest = history
        .iter()
        .fold(None::<&PriceRecord>, |latest, record| match latest {
            Some(current) if current.source_invoice_date > record.source_invoice_date => latest,
            _ => Some(record),
        });

    let total = history
        .iter()
        .fold(BigDecimal::zero(), |acc, record| acc + &record.price);
    let average = total / BigDecimal::from(history.len() as i64);

    let best = history.iter().map(|record| &record.price).min();

    ledger.current_price = latest.map(|record| record.price.clone());
    ledger.last_invoice_date = latest.map(|record| record.source_invoice_date);
    ledger.average_price = Some(average.round(AVERAGE_PRICE_SCALE));
    ledger.best_price = best.cloned();
}
