use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::models::ledger::{SupplierIdentity, SupplierPriceLedger};
use crate::service::normalizer::normalize_description;

/// 别名描述的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionProvenance {
    Original,
    Invoice,
    Manual,
    Supplier,
}

impl DescriptionProvenance {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Invoice => "invoice",
            Self::Manual => "manual",
            Self::Supplier => "supplier",
        }
    }
}

/// 目录条目审批状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// 审批记录 (非 pending 状态时存在)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub approved_by: String,
    pub decided_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// 别名描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeDescription {
    pub text: String,
    pub normalized_text: String,
    pub provenance: DescriptionProvenance,
    pub frequency: u32,
    pub last_seen_at: DateTime<Utc>,
    pub confidence: f64,
    pub added_by: Option<String>,
}

/// 可由值本身推出映射键的记录
trait Keyed {
    fn key(&self) -> String;
}

impl Keyed for AlternativeDescription {
    fn key(&self) -> String {
        self.normalized_text.clone()
    }
}

impl Keyed for SupplierPriceLedger {
    fn key(&self) -> String {
        self.supplier.ledger_key()
    }
}

/// 有序映射按值数组序列化, 读回时保持插入顺序 (JSONB 对象会重排键)
mod ordered_values {
    use super::*;

    pub fn serialize<S, V>(map: &IndexMap<String, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de> + Keyed,
    {
        let values = Vec::<V>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|value| (value.key(), value)).collect())
    }
}

/// 目录条目: 租户内一个独立商品
///
/// `description` 与 `normalized_description` 只能通过 [`CatalogEntry::set_description`]
/// 一起修改; 供应商账本的派生价格只由账本自身重新计算.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub tenant_id: String,
    internal_code: String,
    description: String,
    normalized_description: String,
    /// 键: 规范化文本
    #[serde(with = "ordered_values")]
    pub(crate) alternative_descriptions: IndexMap<String, AlternativeDescription>,
    /// 键: 供应商税号 (规范化后)
    #[serde(with = "ordered_values")]
    pub(crate) supplier_ledgers: IndexMap<String, SupplierPriceLedger>,
    pub approval_status: ApprovalStatus,
    pub approval: Option<ApprovalRecord>,
    pub duplicate_ignored: bool,
    pub(crate) version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// 新建条目, 原始描述以 confidence 1.0 登记为 original 别名
    pub fn new(tenant_id: &str, internal_code: &str, description: &str) -> Self {
        let now = Utc::now();
        let normalized = normalize_description(description);
        let mut alternative_descriptions = IndexMap::new();
        alternative_descriptions.insert(
            normalized.clone(),
            AlternativeDescription {
                text: description.trim().to_string(),
                normalized_text: normalized.clone(),
                provenance: DescriptionProvenance::Original,
                frequency: 1,
                last_seen_at: now,
                confidence: 1.0,
                added_by: None,
            },
        );

        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            internal_code: internal_code.to_string(),
            description: description.trim().to_string(),
            normalized_description: normalized,
            alternative_descriptions,
            supplier_ledgers: IndexMap::new(),
            approval_status: ApprovalStatus::Pending,
            approval: None,
            duplicate_ignored: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn internal_code(&self) -> &str {
        &self.internal_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn normalized_description(&self) -> &str {
        &self.normalized_description
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// 修改展示描述, 同时重算规范化描述
    ///
    /// original 别名随之改为新描述, 旧措辞不再作为精确匹配的别名.
    pub fn set_description(&mut self, description: &str) {
        let now = Utc::now();
        let normalized = normalize_description(description);
        self.alternative_descriptions
            .retain(|_, alt| alt.provenance != DescriptionProvenance::Original);

        let original = match self.alternative_descriptions.shift_remove(&normalized) {
            Some(mut existing) => {
                existing.text = description.trim().to_string();
                existing.provenance = DescriptionProvenance::Original;
                existing.confidence = 1.0;
                existing.last_seen_at = now;
                existing
            }
            None => AlternativeDescription {
                text: description.trim().to_string(),
                normalized_text: normalized.clone(),
                provenance: DescriptionProvenance::Original,
                frequency: 1,
                last_seen_at: now,
                confidence: 1.0,
                added_by: None,
            },
        };
        self.alternative_descriptions
            .shift_insert(0, normalized.clone(), original);

        self.description = description.trim().to_string();
        self.normalized_description = normalized;
        self.updated_at = now;
    }

    /// 仅在重试生成编码时使用 (条目尚未持久化)
    pub(crate) fn reassign_code(&mut self, internal_code: String) {
        debug_assert_eq!(self.version, 0, "internal code is immutable once stored");
        self.internal_code = internal_code;
    }

    pub fn alternative_descriptions(&self) -> impl Iterator<Item = &AlternativeDescription> {
        self.alternative_descriptions.values()
    }

    pub fn alternative(&self, normalized_text: &str) -> Option<&AlternativeDescription> {
        self.alternative_descriptions.get(normalized_text)
    }

    pub fn supplier_ledgers(&self) -> impl Iterator<Item = &SupplierPriceLedger> {
        self.supplier_ledgers.values()
    }

    pub fn supplier_ledger(&self, supplier: &SupplierIdentity) -> Option<&SupplierPriceLedger> {
        self.supplier_ledgers.get(&supplier.ledger_key())
    }

    /// 用于匹配的全部规范化文本 (规范描述在前)
    pub fn match_texts(&self) -> impl Iterator<Item = (&str, &str)> {
        std::iter::once((self.description.as_str(), self.normalized_description.as_str())).chain(
            self.alternative_descriptions
                .values()
                .filter(|alt| alt.normalized_text != self.normalized_description)
                .map(|alt| (alt.text.as_str(), alt.normalized_text.as_str())),
        )
    }

    pub fn approve(&mut self, approved_by: &str, notes: Option<String>) {
        self.decide(ApprovalStatus::Approved, approved_by, notes);
    }

    pub fn reject(&mut self, rejected_by: &str, notes: Option<String>) {
        self.decide(ApprovalStatus::Rejected, rejected_by, notes);
    }

    fn decide(&mut self, status: ApprovalStatus, by: &str, notes: Option<String>) {
        let now = Utc::now();
        self.approval_status = status;
        self.approval = Some(ApprovalRecord {
            approved_by: by.to_string(),
            decided_at: now,
            notes,
        });
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_registers_original_description() {
        let entry = CatalogEntry::new("t1", "WID-000001", "  Widget Pro 500 ");

        assert_eq!(entry.description(), "Widget Pro 500");
        assert_eq!(entry.normalized_description(), "widget pro 500");
        let original = entry.alternative("widget pro 500").expect("original alias");
        assert_eq!(original.provenance, DescriptionProvenance::Original);
        assert_eq!(original.frequency, 1);
        assert!((original.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(entry.approval_status, ApprovalStatus::Pending);
    }

    #[test]
    fn set_description_recomputes_normalized_form() {
        let mut entry = CatalogEntry::new("t1", "WID-000001", "Widget Pro 500");
        entry.set_description("Widget, PRO-600!");

        assert_eq!(entry.description(), "Widget, PRO-600!");
        assert_eq!(entry.normalized_description(), "widget pro 600");
    }

    #[test]
    fn set_description_moves_the_original_alias() {
        let mut entry = CatalogEntry::new("t1", "WID-000001", "Widget Pro 500");
        entry.alternative_descriptions.insert(
            "widget pro 600".to_string(),
            AlternativeDescription {
                text: "WIDGET PRO 600".to_string(),
                normalized_text: "widget pro 600".to_string(),
                provenance: DescriptionProvenance::Invoice,
                frequency: 3,
                last_seen_at: Utc::now(),
                confidence: 0.8,
                added_by: None,
            },
        );

        entry.set_description("Widget Pro 600");

        assert!(entry.alternative("widget pro 500").is_none());
        let original = entry.alternative("widget pro 600").expect("new original");
        assert_eq!(original.provenance, DescriptionProvenance::Original);
        assert_eq!(original.frequency, 3);
        assert!((original.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(entry.alternative_descriptions().count(), 1);
        assert!(entry.match_texts().all(|(_, normalized)| normalized == "widget pro 600"));
    }

    #[test]
    fn json_document_keeps_alias_and_ledger_order() {
        let mut entry = CatalogEntry::new("t1", "WID-000001", "Widget Pro 500 blu");
        for text in ["widget pro 500", "wp500"] {
            entry.alternative_descriptions.insert(
                text.to_string(),
                AlternativeDescription {
                    text: text.to_uppercase(),
                    normalized_text: text.to_string(),
                    provenance: DescriptionProvenance::Invoice,
                    frequency: 1,
                    last_seen_at: Utc::now(),
                    confidence: 0.8,
                    added_by: None,
                },
            );
        }
        for (fiscal_id, name) in [("IT999", "Zeta srl"), ("IT01234567890", "ACME S.p.A.")] {
            let supplier = SupplierIdentity::new(fiscal_id, name);
            entry
                .supplier_ledgers
                .insert(supplier.ledger_key(), SupplierPriceLedger::new(supplier));
        }

        let json = serde_json::to_value(&entry).expect("serialize");
        assert!(json["alternative_descriptions"].is_array());
        let restored: CatalogEntry = serde_json::from_value(json).expect("deserialize");

        let aliases: Vec<_> = restored
            .alternative_descriptions()
            .map(|a| a.normalized_text.as_str())
            .collect();
        assert_eq!(aliases, vec!["widget pro 500 blu", "widget pro 500", "wp500"]);
        let ledgers: Vec<_> = restored
            .supplier_ledgers()
            .map(|l| l.supplier.fiscal_id.as_str())
            .collect();
        assert_eq!(ledgers, vec!["IT999", "IT01234567890"]);
        assert_eq!(restored.alternative("wp500").map(|a| a.text.as_str()), Some("WP500"));
        assert_eq!(restored, entry);
    }

    #[test]
    fn approval_records_approver_and_notes() {
        let mut entry = CatalogEntry::new("t1", "WID-000001", "Widget Pro 500");
        entry.approve("alice", Some("checked datasheet".to_string()));

        assert_eq!(entry.approval_status, ApprovalStatus::Approved);
        let record = entry.approval.as_ref().expect("approval record");
        assert_eq!(record.approved_by, "alice");
        assert_eq!(record.notes.as_deref(), Some("checked datasheet"));
    }
}
