pub mod catalog;
pub mod invoice;
pub mod ledger;
pub mod result;
pub mod tenant_config;

pub use catalog::{
    AlternativeDescription, ApprovalRecord, ApprovalStatus, CatalogEntry, DescriptionProvenance,
};
pub use invoice::{
    ImportedInvoice, InvoiceHeader, InvoiceLineItem, LineMatchProjection, LineMatchUpdate,
    MatchingMethod, MatchingStatus, ReviewSuggestion,
};
pub use ledger::{
    InvoiceReference, PriceObservation, PriceRecord, SupplierIdentity, SupplierPriceLedger,
    DEFAULT_CURRENCY,
};
pub use result::{
    DecisionReason, DuplicateGroup, ImportReport, ImportSummary, LineOutcome, LineReport,
    MatchQuality, MatchType, PhaseDecision, SearchOptions, SimilarProduct,
};
pub use tenant_config::{AnalyticsPhase, MatchingPhase, NewProductPhase, TenantMatchingConfig};
