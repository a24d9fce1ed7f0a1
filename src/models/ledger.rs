use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "EUR";

/// 供应商身份: 以税号识别, 名称仅用于展示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierIdentity {
    pub fiscal_id: String,
    pub name: String,
}

impl SupplierIdentity {
    pub fn new(fiscal_id: &str, name: &str) -> Self {
        Self {
            fiscal_id: fiscal_id.to_string(),
            name: name.to_string(),
        }
    }

    /// 账本键: 税号去空白与标点并大写; 无税号时退回规范化名称
    pub fn ledger_key(&self) -> String {
        let key = Self::key_for(&self.fiscal_id);
        if key.is_empty() {
            format!("name:{}", crate::service::normalizer::normalize_description(&self.name))
        } else {
            key
        }
    }

    pub fn key_for(fiscal_id: &str) -> String {
        fiscal_id
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// 一次价格观测 (来自发票行)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub price: BigDecimal,
    pub currency: Option<String>,
    pub quantity: Option<BigDecimal>,
    pub unit_of_measure: Option<String>,
}

/// 价格来源发票行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceReference {
    pub invoice_id: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub line_number: u32,
}

/// 价格历史记录, 写入后不可修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub price: BigDecimal,
    pub currency: String,
    pub quantity: BigDecimal,
    pub unit_of_measure: Option<String>,
    pub source_invoice_id: String,
    pub source_invoice_number: String,
    pub source_invoice_date: NaiveDate,
    pub source_line_number: u32,
    pub observed_at: DateTime<Utc>,
}

impl PriceRecord {
    pub fn is_from(&self, invoice_id: &str, line_number: u32) -> bool {
        self.source_invoice_id == invoice_id && self.source_line_number == line_number
    }
}

/// 供应商价格账本: 只追加的价格历史 + 派生统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierPriceLedger {
    pub supplier: SupplierIdentity,
    pub(crate) price_history: Vec<PriceRecord>,
    pub(crate) current_price: Option<BigDecimal>,
    pub(crate) average_price: Option<BigDecimal>,
    pub(crate) best_price: Option<BigDecimal>,
    pub(crate) last_invoice_date: Option<NaiveDate>,
}

impl SupplierPriceLedger {
    pub fn new(supplier: SupplierIdentity) -> Self {
        Self {
            supplier,
            price_history: Vec::new(),
            current_price: None,
            average_price: None,
            best_price: None,
            last_invoice_date: None,
        }
    }

    pub fn price_history(&self) -> &[PriceRecord] {
        &self.price_history
    }

    pub fn current_price(&self) -> Option<&BigDecimal> {
        self.current_price.as_ref()
    }

    pub fn average_price(&self) -> Option<&BigDecimal> {
        self.average_price.as_ref()
    }

    pub fn best_price(&self) -> Option<&BigDecimal> {
        self.best_price.as_ref()
    }

    pub fn last_invoice_date(&self) -> Option<NaiveDate> {
        self.last_invoice_date
    }

    pub fn contains_invoice_line(&self, invoice_id: &str, line_number: u32) -> bool {
        self.price_history
            .iter()
            .any(|record| record.is_from(invoice_id, line_number))
    }
}
