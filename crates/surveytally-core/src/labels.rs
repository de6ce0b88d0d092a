//! The closed label/category vocabularies used by Korean education
//! satisfaction surveys, and the fixed category display order.

/// The five satisfaction labels, best to worst. Index order is the display
/// order used by histograms and report tables.
pub const LABELS: [&str; 5] = ["매우만족", "만족", "보통", "불만", "매우불만"];

/// The five question categories in report priority order. The last entry is
/// the catch-all.
pub const CATEGORIES: [&str; 5] = [
    "교육기획평가",
    "교육환경평가",
    "강사평가",
    "프로그램 성과평가",
    "기타",
];

/// The default/catch-all category.
pub const OTHER_CATEGORY: &str = "기타";

/// Fixed sort priority for a category. Anything outside the recognized set
/// sorts after the catch-all.
pub fn category_priority(category: &str) -> u8 {
    match CATEGORIES.iter().position(|c| *c == category) {
        Some(i) => i as u8 + 1,
        None => u8::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_follows_declaration_order() {
        assert_eq!(category_priority("교육기획평가"), 1);
        assert_eq!(category_priority("교육환경평가"), 2);
        assert_eq!(category_priority("강사평가"), 3);
        assert_eq!(category_priority("프로그램 성과평가"), 4);
        assert_eq!(category_priority("기타"), 5);
    }

    #[test]
    fn unknown_category_sorts_last() {
        assert!(category_priority("중간평가") > category_priority("기타"));
        assert!(category_priority("") > category_priority("기타"));
    }
}
