use regex::Regex;
use std::sync::LazyLock;

const MONTHS: &str = "gennaio|febbraio|marzo|aprile|maggio|giugno|luglio|agosto|settembre|ottobre|novembre|dicembre|\
january|february|march|april|may|june|july|august|september|october|november|december|\
gen|feb|apr|mag|giu|lug|ago|ott|nov|jan|jun|jul|aug|sep|oct";

/// 周期性账单中的噪声: 月份+年份, mm/yyyy, "canone mensile" 等样板文字
static NOISE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"(?i)\b(?:(?:mese|month|periodo|period)\s+(?:di\s+|of\s+)?)?(?:{MONTHS})(?:\.\s*|\s+)(?:19|20)\d{{2}}\b"),
        r"(?i)\b(?:0?[1-9]|1[0-2])\s*[/\-.]\s*(?:19|20)\d{2}\b".to_string(),
        r"(?i)\b(?:canone|rata|pagamento|quota)\s+mensile\b".to_string(),
        r"(?i)\bmonthly\s+(?:payment|fee|instal?ment|charge)\b".to_string(),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("noise pattern compiles"))
    .collect()
});

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("punctuation pattern compiles"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

/// 描述规范化: 去噪声 -> 小写 -> 去标点 -> 合并空白
///
/// 结果是不动点, 因此 `normalize_description(normalize_description(x)) == normalize_description(x)`.
pub fn normalize_description(raw: &str) -> String {
    let mut current = normalize_once(raw);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(text: &str) -> String {
    let stripped = NOISE_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, re| re.replace_all(&acc, " ").into_owned());
    let lowered = stripped.to_lowercase();
    let spaced = NON_WORD.replace_all(&lowered, " ");
    WHITESPACE.replace_all(spaced.trim(), " ").into_owned()
}
