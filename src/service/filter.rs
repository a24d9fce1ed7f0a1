use bigdecimal::{BigDecimal, Zero};
use regex::Regex;
use std::sync::LazyLock;

use crate::models::InvoiceLineItem;
use crate::service::normalizer::normalize_description;

/// 非商品行的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonProductKind {
    TransportDocument,
    RegulatoryCitation,
    PaymentNote,
    EnvironmentalFee,
}

impl NonProductKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransportDocument => "transport document reference",
            Self::RegulatoryCitation => "regulatory citation",
            Self::PaymentNote => "payment or banking note",
            Self::EnvironmentalFee => "environmental fee notice",
        }
    }
}

/// 过滤结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineVerdict {
    Product,
    EmptyDescription,
    NonProduct(NonProductKind),
    InformationalNote { signals: usize },
    ZeroQuantityNote { signals: usize },
}

impl LineVerdict {
    pub fn is_product(&self) -> bool {
        matches!(self, Self::Product)
    }

    /// 跳过时写入发票行的说明
    pub fn skip_note(&self) -> Option<String> {
        match self {
            Self::Product => None,
            Self::EmptyDescription => Some("skipped: empty description".to_string()),
            Self::NonProduct(kind) => Some(format!("skipped: {}", kind.as_str())),
            Self::InformationalNote { signals } => Some(format!(
                "skipped: zero-priced line treated as informational note ({signals} product signal(s))"
            )),
            Self::ZeroQuantityNote { signals } => Some(format!(
                "skipped: zero quantity and description does not look like a product ({signals} product signal(s))"
            )),
        }
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("filter pattern compiles"))
        .collect()
}

static NON_PRODUCT_PATTERNS: LazyLock<Vec<(NonProductKind, Vec<Regex>)>> = LazyLock::new(|| {
    vec![
        (
            NonProductKind::TransportDocument,
            compile(&[
                r"(?i)\bd\.?\s?d\.?\s?t\.?\s*(?:n\.?|nr\.?|num\.?|numero|del)?\s*\d",
                r"(?i)\bdocumento\s+di\s+trasporto\b",
                r"(?i)\b(?:rif\.?|riferimento)\s+(?:ns\.?|vs\.?)?\s*(?:ddt|bolla|ordine|conferma)\b",
                r"(?i)\bbolla\s+(?:di\s+consegna\s+)?(?:n\.?|nr\.?)\s*\d",
                r"(?i)\b(?:delivery\s+note|packing\s+slip)\b",
            ]),
        ),
        (
            NonProductKind::RegulatoryCitation,
            compile(&[
                r"(?i)\bart(?:icolo)?\.?\s*\d+[\w/-]*\s*,?\s*(?:comma|c\.|d\.?\s?p\.?\s?r|d\.?\s?lgs|legge|l\.\s*\d|del\s+d)",
                r"(?i)\bd\.?\s?p\.?\s?r\.?\s*(?:n\.?\s*)?\d+",
                r"(?i)\bd\.?\s?lgs\.?\s*(?:n\.?\s*)?\d+",
                r"(?i)\blegge\s+(?:n\.?\s*)?\d+",
                r"(?i)\b(?:esente|esenzione|non\s+imponibile|fuori\s+campo)\s+(?:iva|art)",
                r"(?i)\b(?:reverse\s+charge|inversione\s+contabile|split\s+payment|scissione\s+dei\s+pagamenti)\b",
                r"(?i)\bregime\s+(?:forfettario|dei\s+minimi|del\s+margine)\b",
            ]),
        ),
        (
            NonProductKind::PaymentNote,
            compile(&[
                r"(?i)\biban\b",
                r"(?i)\bbonifico(?:\s+bancario)?\b",
                r"(?i)\b(?:ri\.?\s?ba\.?|ricevuta\s+bancaria)\b",
                r"(?i)\bcoordinate\s+bancarie\b",
                r"(?i)\b(?:scadenza|termini)\s+(?:di\s+)?pagamento\b",
                r"(?i)\bpagamento\s+(?:a\s+)?\d+\s*(?:gg|giorni)\b",
                r"(?i)\bpayment\s+(?:terms|due)\b",
            ]),
        ),
        (
            NonProductKind::EnvironmentalFee,
            compile(&[
                r"(?i)\bcontributo\s+ambientale\b",
                r"(?i)\bconai\b",
                r"(?i)\bassolto\s+ove\s+dovuto\b",
                r"(?i)\beco\s?-?contributo\b",
                r"(?i)\braee\b",
            ]),
        ),
    ]
});

static PRODUCT_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:[a-z]+[\-/.]?\d+[a-z0-9\-/.]*|\d+[\-/.]?[a-z]+[a-z0-9\-/.]*)\b")
        .expect("product code pattern compiles")
});

static UNIT_OF_MEASURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b|\d)(?:pz|pezzi|pcs|kg|gr|g|mg|lt|l|ml|cl|mt|m|cm|mm|mq|m2|mc|m3|nr|conf|cf|rotol[oi]|box|set|kit|paia|coppia)\b",
    )
    .expect("unit pattern compiles")
});

static DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+(?:[.,]\d+)?\s*[x×*]\s*\d+(?:[.,]\d+)?").expect("dimension pattern compiles")
});

static MATERIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:acciaio|inox|ferro|ghisa|alluminio|ottone|rame|bronzo|zincat[oa]|plastica|pvc|nylon|gomma|legno|vetro|ceramica|cotone|carta|cartone|steel|stainless|iron|aluminium|aluminum|brass|copper|plastic|rubber|wood|glass)\b",
    )
    .expect("material pattern compiles")
});

const MIN_PLAUSIBLE_LEN: usize = 4;
const MAX_PLAUSIBLE_LEN: usize = 120;
const MIN_PRODUCT_SIGNALS: usize = 2;

/// 描述匹配到的非商品类别 (若有)
pub fn non_product_kind(description: &str) -> Option<NonProductKind> {
    NON_PRODUCT_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(description)))
        .map(|(kind, _)| *kind)
}

/// "像商品"的独立信号个数: 合理长度, 商品编码, 计量单位, 尺寸, 材质
pub fn product_signal_count(description: &str) -> usize {
    let trimmed = description.trim();
    let len = trimmed.chars().count();
    [
        (MIN_PLAUSIBLE_LEN..=MAX_PLAUSIBLE_LEN).contains(&len)
            && trimmed.split_whitespace().count() >= 2,
        PRODUCT_CODE.is_match(trimmed),
        UNIT_OF_MEASURE.is_match(trimmed),
        DIMENSION.is_match(trimmed),
        MATERIAL.is_match(trimmed),
    ]
    .into_iter()
    .filter(|signal| *signal)
    .count()
}

pub fn looks_like_product(description: &str) -> bool {
    product_signal_count(description) >= MIN_PRODUCT_SIGNALS
}

fn is_zero_or_missing(value: Option<&BigDecimal>) -> bool {
    value.map_or(true, Zero::is_zero)
}

/// 判定发票行是否为可购买商品
pub fn classify_line(line: &InvoiceLineItem) -> LineVerdict {
    let description = line.description.trim();
    if normalize_description(description).is_empty() {
        return LineVerdict::EmptyDescription;
    }

    if let Some(kind) = non_product_kind(description) {
        return LineVerdict::NonProduct(kind);
    }

    let signals = product_signal_count(description);
    if is_zero_or_missing(line.unit_price.as_ref()) {
        if signals < MIN_PRODUCT_SIGNALS {
            return LineVerdict::InformationalNote { signals };
        }
        return LineVerdict::Product;
    }

    if line.quantity.as_ref().is_some_and(Zero::is_zero) && signals < MIN_PRODUCT_SIGNALS {
        return LineVerdict::ZeroQuantityNote { signals };
    }

    LineVerdict::Product
}

pub fn is_valid_product_line(line: &InvoiceLineItem) -> bool {
    classify_line(line).is_product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SupplierIdentity;
    use std::str::FromStr;

    fn line(description: &str, price: Option<&str>, quantity: Option<&str>) -> InvoiceLineItem {
        InvoiceLineItem {
            id: 1,
            line_number: 1,
            description: description.to_string(),
            quantity: quantity.map(|q| BigDecimal::from_str(q).expect("decimal")),
            unit_price: price.map(|p| BigDecimal::from_str(p).expect("decimal")),
            currency: Some("EUR".to_string()),
            unit_of_measure: None,
            supplier: SupplierIdentity::new("IT01234567890", "Ferramenta Srl"),
            projection: Default::default(),
        }
    }

    #[test]
    fn environmental_fee_notice_is_rejected() {
        let verdict = classify_line(&line(
            "Contributo ambientale CONAI assolto ove dovuto",
            Some("0"),
            Some("1"),
        ));
        assert_eq!(
            verdict,
            LineVerdict::NonProduct(NonProductKind::EnvironmentalFee)
        );
        assert!(verdict.skip_note().expect("note").contains("environmental"));
    }

    #[test]
    fn stainless_screw_line_is_accepted() {
        let item = line("VITE M6X20 ACCIAIO INOX — 100 PZ", Some("0.05"), Some("100"));
        assert!(is_valid_product_line(&item));
    }

    #[test]
    fn blank_description_is_rejected() {
        assert_eq!(
            classify_line(&line("   ", Some("10"), Some("1"))),
            LineVerdict::EmptyDescription
        );
    }

    #[test]
    fn non_product_patterns_apply_regardless_of_price() {
        assert!(!is_valid_product_line(&line(
            "Rif. DDT n. 1234 del 12/03/2024",
            Some("15.00"),
            Some("1")
        )));
        assert!(!is_valid_product_line(&line(
            "Pagamento tramite bonifico bancario IBAN IT60X0542811101000000123456",
            Some("1"),
            Some("1")
        )));
        assert!(!is_valid_product_line(&line(
            "Operazione in reverse charge art. 17 comma 6 DPR 633/72",
            None,
            None
        )));
    }

    #[test]
    fn zero_priced_line_needs_two_product_signals() {
        assert_eq!(
            classify_line(&line("Omaggio", Some("0"), Some("1"))),
            LineVerdict::InformationalNote { signals: 0 }
        );
        assert!(is_valid_product_line(&line(
            "Campione tubo PVC 20x2 mm",
            Some("0"),
            Some("1")
        )));
    }

    #[test]
    fn zero_quantity_accepted_only_when_it_looks_like_a_product() {
        assert!(is_valid_product_line(&line(
            "Staffa acciaio zincato 40x40",
            Some("3.20"),
            Some("0")
        )));
        assert!(matches!(
            classify_line(&line("Note", Some("3.20"), Some("0"))),
            LineVerdict::ZeroQuantityNote { .. }
        ));
    }

    #[test]
    fn product_codes_alone_are_not_regulatory_citations() {
        assert_eq!(non_product_kind("ART. 4456 RONDELLA OTTONE"), None);
    }
}
