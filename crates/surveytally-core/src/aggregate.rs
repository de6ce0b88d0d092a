//! Canonicalization & aggregation: merges near-duplicate question phrasings
//! into one statistical bucket and tallies scores per bucket.
//!
//! This is a pure projection over the document collection — it is recomputed
//! from scratch on every call and never persisted, so it can safely be
//! invoked mid-run on partially-updated state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::labels::{self, OTHER_CATEGORY};
use crate::matching::{raw_question_key, similarity};
use crate::{PageStatus, SurveyDocument};

/// Two question phrasings at or above this similarity share a bucket.
pub const MERGE_THRESHOLD: f64 = 0.8;

/// Histogram over the five recognized satisfaction labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDistribution {
    pub very_satisfied: u32,
    pub satisfied: u32,
    pub neutral: u32,
    pub dissatisfied: u32,
    pub very_dissatisfied: u32,
}

impl LabelDistribution {
    /// Mutable slot for a label, `None` when the label is outside the
    /// recognized vocabulary.
    pub fn slot_mut(&mut self, label: &str) -> Option<&mut u32> {
        match label {
            "매우만족" => Some(&mut self.very_satisfied),
            "만족" => Some(&mut self.satisfied),
            "보통" => Some(&mut self.neutral),
            "불만" => Some(&mut self.dissatisfied),
            "매우불만" => Some(&mut self.very_dissatisfied),
            _ => None,
        }
    }

    /// (label, count) pairs in display order.
    pub fn entries(&self) -> [(&'static str, u32); 5] {
        [
            (labels::LABELS[0], self.very_satisfied),
            (labels::LABELS[1], self.satisfied),
            (labels::LABELS[2], self.neutral),
            (labels::LABELS[3], self.dissatisfied),
            (labels::LABELS[4], self.very_dissatisfied),
        ]
    }

    pub fn total(&self) -> u32 {
        self.very_satisfied
            + self.satisfied
            + self.neutral
            + self.dissatisfied
            + self.very_dissatisfied
    }
}

/// Aggregated statistics for one canonical question.
///
/// `distribution.total() <= count`: items with an unrecognized label are
/// counted in `count` and `total_score` but excluded from the histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStat {
    /// The canonical question text (first-seen raw key of the bucket).
    pub question: String,
    pub category: String,
    pub average_score: f64,
    pub count: u32,
    pub total_score: u64,
    pub distribution: LabelDistribution,
}

struct Bucket {
    question: String,
    category: String,
    total_score: u64,
    count: u32,
    distribution: LabelDistribution,
}

impl Bucket {
    fn new(question: String, category: &str) -> Self {
        let category = if category.is_empty() {
            OTHER_CATEGORY.to_string()
        } else {
            category.to_string()
        };
        Self {
            question,
            category,
            total_score: 0,
            count: 0,
            distribution: LabelDistribution::default(),
        }
    }
}

/// Derive the ordered per-question statistics from the full document set.
///
/// Iterates documents, then pages, then items in stored order; only
/// `Completed` pages contribute. Bucket resolution is memoized per raw
/// question text, so the linear scan over existing canonical keys runs at
/// most once per distinct phrasing. The final output is sorted by category
/// priority then question text, which makes it independent of item order
/// even though bucket formation is order-sensitive.
pub fn aggregate_stats(documents: &[SurveyDocument]) -> Vec<AggregatedStat> {
    let mut buckets: Vec<Bucket> = Vec::new();
    // raw question text -> index of its resolved bucket
    let mut memo: HashMap<String, usize> = HashMap::new();

    for doc in documents {
        for response in &doc.responses {
            if response.status != PageStatus::Completed {
                continue;
            }
            for item in &response.items {
                let raw_key = raw_question_key(&item.question);
                if raw_key.is_empty() {
                    continue;
                }

                let idx = match memo.get(&raw_key) {
                    Some(&idx) => idx,
                    None => {
                        let idx = resolve_bucket(&mut buckets, &raw_key, &item.category);
                        memo.insert(raw_key, idx);
                        idx
                    }
                };

                let bucket = &mut buckets[idx];
                bucket.total_score += u64::from(item.score);
                bucket.count += 1;
                if let Some(slot) = bucket.distribution.slot_mut(&item.label) {
                    *slot += 1;
                }
                // First specific category wins; later ones never overwrite.
                if bucket.category == OTHER_CATEGORY
                    && !item.category.is_empty()
                    && item.category != OTHER_CATEGORY
                {
                    bucket.category = item.category.clone();
                }
            }
        }
    }

    let mut stats: Vec<AggregatedStat> = buckets
        .into_iter()
        .map(|b| AggregatedStat {
            question: b.question,
            category: b.category,
            average_score: if b.count > 0 {
                b.total_score as f64 / b.count as f64
            } else {
                0.0
            },
            count: b.count,
            total_score: b.total_score,
            distribution: b.distribution,
        })
        .collect();

    stats.sort_by(|a, b| {
        labels::category_priority(&a.category)
            .cmp(&labels::category_priority(&b.category))
            .then_with(|| a.question.cmp(&b.question))
    });
    stats
}

/// Find the bucket a raw key merges into, creating a new one when nothing
/// reaches the threshold. Scans canonical keys in creation order and keeps
/// the strictly greatest similarity; an equal later score never displaces an
/// earlier candidate.
fn resolve_bucket(buckets: &mut Vec<Bucket>, raw_key: &str, category: &str) -> usize {
    let mut best: Option<(usize, f64)> = None;
    for (i, bucket) in buckets.iter().enumerate() {
        let score = similarity(raw_key, &bucket.question);
        if score >= MERGE_THRESHOLD && best.is_none_or(|(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    match best {
        Some((i, _)) => i,
        None => {
            buckets.push(Bucket::new(raw_key.to_string(), category));
            buckets.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PageResponse, SurveyItem};

    fn item(question: &str, score: u32, label: &str, category: &str) -> SurveyItem {
        SurveyItem {
            question: question.to_string(),
            score,
            label: label.to_string(),
            category: category.to_string(),
        }
    }

    fn document_with_items(items: Vec<SurveyItem>) -> SurveyDocument {
        let mut doc = SurveyDocument::new("scan.pdf", "application/pdf", vec![]);
        doc.total_pages = 1;
        doc.responses = vec![PageResponse {
            status: PageStatus::Completed,
            items,
            ..PageResponse::pending(0)
        }];
        doc
    }

    #[test]
    fn tallies_scores_and_distribution() {
        let doc = document_with_items(vec![
            item("강사의 전문성", 5, "매우만족", "강사평가"),
            item("강사의 전문성", 4, "만족", "강사평가"),
            item("강사의 전문성", 5, "매우만족", "강사평가"),
        ]);

        let stats = aggregate_stats(&[doc]);
        assert_eq!(stats.len(), 1);
        let stat = &stats[0];
        assert_eq!(stat.count, 3);
        assert_eq!(stat.total_score, 14);
        assert!((stat.average_score - 14.0 / 3.0).abs() < 1e-12);
        assert_eq!(stat.distribution.very_satisfied, 2);
        assert_eq!(stat.distribution.satisfied, 1);
        assert_eq!(stat.distribution.total(), 3);
    }

    #[test]
    fn near_duplicates_merge_into_first_seen_key() {
        let doc = document_with_items(vec![
            item("강사의 전문성", 5, "매우만족", "강사평가"),
            item("강사의 전문성(설명)", 4, "만족", "강사평가"),
        ]);

        let stats = aggregate_stats(&[doc]);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].question, "강사의 전문성");
        assert_eq!(stats[0].count, 2);
        assert!((stats[0].average_score - 4.5).abs() < 1e-12);
    }

    #[test]
    fn below_threshold_forms_new_bucket() {
        // 3 of 10 chars differ: similarity 0.7, below the 0.8 threshold.
        let doc = document_with_items(vec![
            item("abcdefghij", 5, "매우만족", "기타"),
            item("abcdefgXYZ", 4, "만족", "기타"),
        ]);

        let stats = aggregate_stats(&[doc]);
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn just_above_threshold_merges() {
        // 2 of 10 chars differ: similarity 0.8, exactly at the threshold.
        let doc = document_with_items(vec![
            item("abcdefghij", 5, "매우만족", "기타"),
            item("abcdefghXY", 4, "만족", "기타"),
        ]);

        let stats = aggregate_stats(&[doc]);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].question, "abcdefghij");
    }

    #[test]
    fn unrecognized_label_counts_but_skips_histogram() {
        let doc = document_with_items(vec![
            item("강사의 전문성", 5, "매우만족", "강사평가"),
            item("강사의 전문성", 3, "괜찮음", "강사평가"),
        ]);

        let stats = aggregate_stats(&[doc]);
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].total_score, 8);
        assert_eq!(stats[0].distribution.total(), 1);
    }

    #[test]
    fn empty_question_is_dropped() {
        let doc = document_with_items(vec![
            item("(응답 없음)", 5, "매우만족", "기타"),
            item("   ", 4, "만족", "기타"),
        ]);
        assert!(aggregate_stats(&[doc]).is_empty());
    }

    #[test]
    fn first_specific_category_wins() {
        let doc = document_with_items(vec![
            item("교육 내용의 적절성", 4, "만족", "기타"),
            item("교육 내용의 적절성", 5, "매우만족", "교육기획평가"),
            item("교육 내용의 적절성", 3, "보통", "강사평가"),
        ]);

        let stats = aggregate_stats(&[doc]);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].category, "교육기획평가");
    }

    #[test]
    fn empty_category_defaults_to_other() {
        let doc = document_with_items(vec![item("교육장 위치", 4, "만족", "")]);
        let stats = aggregate_stats(&[doc]);
        assert_eq!(stats[0].category, "기타");
    }

    #[test]
    fn pending_and_error_pages_do_not_contribute() {
        let mut doc = document_with_items(vec![item("강사의 전문성", 5, "매우만족", "강사평가")]);
        doc.total_pages = 3;
        doc.responses.push(PageResponse {
            status: PageStatus::Error,
            items: vec![],
            error: Some("analysis failed".into()),
            ..PageResponse::pending(1)
        });
        doc.responses.push(PageResponse::pending(2));

        let stats = aggregate_stats(&[doc]);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].count, 1);
    }

    #[test]
    fn output_sorted_by_category_priority_then_question() {
        let doc = document_with_items(vec![
            item("나중 문항", 4, "만족", "기타"),
            item("강사 태도", 5, "매우만족", "강사평가"),
            item("가장 빠른 문항", 4, "만족", "기타"),
            item("교육장 환경", 3, "보통", "교육환경평가"),
            item("이상한 영역", 2, "불만", "미분류영역"),
        ]);

        let stats = aggregate_stats(&[doc]);
        let order: Vec<&str> = stats.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(
            order,
            vec!["교육환경평가", "강사평가", "기타", "기타", "미분류영역"]
        );
        // Within the same category, question text order.
        assert_eq!(stats[2].question, "가장 빠른 문항");
        assert_eq!(stats[3].question, "나중 문항");
    }

    #[test]
    fn sorted_output_invariant_under_item_permutation() {
        let items = vec![
            item("강사의 전문성", 5, "매우만족", "강사평가"),
            item("교육장 청결", 4, "만족", "교육환경평가"),
            item("강사의 전문성(추가)", 3, "보통", "강사평가"),
            item("교육 목표 달성도", 5, "매우만족", "프로그램 성과평가"),
        ];
        let forward = aggregate_stats(&[document_with_items(items.clone())]);
        let mut reversed_items = items;
        reversed_items.reverse();
        let reversed = aggregate_stats(&[document_with_items(reversed_items)]);

        let key = |stats: &[AggregatedStat]| -> Vec<(String, String, u32, u64)> {
            stats
                .iter()
                .map(|s| {
                    (
                        s.category.clone(),
                        // Canonical text may differ with order; compare the
                        // normalized identity instead.
                        crate::matching::raw_question_key(&s.question),
                        s.count,
                        s.total_score,
                    )
                })
                .collect()
        };
        assert_eq!(key(&forward), key(&reversed));
    }

    #[test]
    fn recomputation_is_idempotent() {
        let doc = document_with_items(vec![
            item("강사의 전문성", 5, "매우만족", "강사평가"),
            item("강사의 전문성(설명)", 4, "만족", "강사평가"),
            item("교육장 청결", 3, "보통", "교육환경평가"),
        ]);
        let docs = vec![doc];
        let first = aggregate_stats(&docs);
        let second = aggregate_stats(&docs);
        assert_eq!(first, second);
    }
}
