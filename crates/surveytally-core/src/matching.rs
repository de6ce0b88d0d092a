use once_cell::sync::Lazy;
use rapidfuzz::distance::levenshtein;
use regex::Regex;

/// Parenthetical spans, including their parentheses: `"문항(보기)"` → `"문항"`.
static PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// The raw bucket key for a question: parenthetical spans removed, outer
/// whitespace trimmed. An empty result means the item carries no usable
/// question text and is dropped from aggregation.
pub fn raw_question_key(question: &str) -> String {
    PAREN_RE.replace_all(question, "").trim().to_string()
}

/// Normalize for comparison — parentheticals removed, then everything that
/// is not a Hangul syllable, ASCII letter, or digit stripped.
///
/// No case folding beyond the character-class filter, no transliteration.
fn normalize(s: &str) -> String {
    PAREN_RE
        .replace_all(s, "")
        .chars()
        .filter(|c| matches!(c, '가'..='힣') || c.is_ascii_alphanumeric())
        .collect()
}

/// Similarity of two question strings in `[0, 1]`.
///
/// Identical normalized forms score 1 (including two strings that both
/// normalize to empty). One-sided empty scores 0. Otherwise
/// `1 − levenshtein / max(len)` over the normalized character sequences.
pub fn similarity(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);

    if na == nb {
        return 1.0;
    }
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }

    let distance = levenshtein::distance(na.chars(), nb.chars());
    let max_len = na.chars().count().max(nb.chars().count());
    1.0 - distance as f64 / max_len as f64
}
