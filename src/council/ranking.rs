//! Extraction of the `FINAL RANKING:` section from free-text reviews.

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::anonymizer::LabelMapping;
use super::types::Review;

/// Parse the ranking, best first. Returns `None` when the review has no
/// ranking section or nothing in it names a known label.
pub fn parse_ranking(text: &str, mapping: &LabelMapping) -> Option<Vec<String>> {
    let header_re = Regex::new(r"(?i)final\s+ranking\s*:?").ok()?;
    let numbered_re =
        Regex::new(r"(?im)^\s*(?:[-*]\s*)?\d+\s*[.):]\s*\**\s*response\s+([a-z]{1,3})\b").ok()?;
    let mention_re = Regex::new(r"\bResponse\s+([A-Z]{1,3})\b").ok()?;

    let starts: Vec<usize> = header_re.find_iter(text).map(|m| m.end()).collect();

    // Latest header with a numbered list wins; instructions may be echoed
    // before it and prose may mention "final ranking" after it
    let numbered = starts.iter().rev().find_map(|&start| {
        let labels = numbered_re
            .captures_iter(&text[start..])
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_uppercase());
        known_labels(labels, mapping)
    });

    // Fallback: mentions in order of appearance
    numbered.or_else(|| {
        starts.iter().rev().find_map(|&start| {
            let labels = mention_re
                .captures_iter(&text[start..])
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string());
            known_labels(labels, mapping)
        })
    })
}

/// Keep labels present in the mapping, first occurrence only.
fn known_labels(
    labels: impl Iterator<Item = String>,
    mapping: &LabelMapping,
) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let ranking: Vec<String> = labels
        .filter(|l| mapping.contains_label(l))
        .filter(|l| seen.insert(l.clone()))
        .collect();

    if ranking.is_empty() {
        None
    } else {
        Some(ranking)
    }
}

/// A model's standing across all parsed peer rankings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRank {
    pub label: String,
    pub model: String,
    /// Mean 1-based position; lower is better.
    pub average_position: f64,
    pub votes: usize,
}

/// Average each label's position over every review that ranked it.
pub fn aggregate_rankings(reviews: &[Review], mapping: &LabelMapping) -> Vec<AggregateRank> {
    let mut positions: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

    for ranking in reviews.iter().filter_map(|r| r.ranking.as_ref()) {
        for (idx, label) in ranking.iter().enumerate() {
            positions.entry(label.as_str()).or_default().push(idx + 1);
        }
    }

    let mut ranks: Vec<AggregateRank> = positions
        .into_iter()
        .filter_map(|(label, pos)| {
            let model = mapping.model_for(label)?;
            Some(AggregateRank {
                label: label.to_string(),
                model: model.to_string(),
                average_position: pos.iter().sum::<usize>() as f64 / pos.len() as f64,
                votes: pos.len(),
            })
        })
        .collect();

    ranks.sort_by(|a, b| {
        a.average_position
            .total_cmp(&b.average_position)
            .then_with(|| a.label.cmp(&b.label))
    });
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::anonymizer::anonymize;
    use crate::council::types::Response;
    use std::time::Duration;

    fn mapping(n: usize) -> LabelMapping {
        let responses: Vec<_> = (1..=n)
            .map(|i| Response::success(format!("m{i}"), "t", Duration::ZERO))
            .collect();
        anonymize(&responses).0
    }

    fn review(reviewer: &str, ranking: Option<&[&str]>) -> Review {
        Review {
            reviewer: reviewer.to_string(),
            text: String::new(),
            ranking: ranking.map(|r| r.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn test_parse_plain_ranking() {
        let text = "Response A is terse. Response B is clear.\n\nFINAL RANKING:\n1. Response B\n2. Response A\n3. Response C\n";
        assert_eq!(
            parse_ranking(text, &mapping(3)),
            Some(vec!["B".to_string(), "A".to_string(), "C".to_string()])
        );
    }

    #[test]
    fn test_parse_markdown_variants() {
        let text = "**Final Ranking:**\n\n1) **Response C** - best\n2) **Response A**\n- 3. response b\n";
        assert_eq!(
            parse_ranking(text, &mapping(3)),
            Some(vec!["C".to_string(), "A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_uses_last_header() {
        let text = "You asked for a FINAL RANKING: 1. Response A first?\n\nFINAL RANKING:\n1. Response B\n2. Response A";
        assert_eq!(
            parse_ranking(text, &mapping(2)),
            Some(vec!["B".to_string(), "A".to_string()])
        );
    }

    #[test]
    fn test_header_mentioned_after_list() {
        let text = "B is best.\n\nFINAL RANKING:\n1. Response B\n2. Response A\n3. Response C\n\nThis final ranking reflects accuracy first.";
        assert_eq!(
            parse_ranking(text, &mapping(3)),
            Some(vec!["B".to_string(), "A".to_string(), "C".to_string()])
        );
    }

    #[test]
    fn test_trailing_header_mention_does_not_override_list() {
        let text = "FINAL RANKING:\n1. Response A\n2. Response B\n\nIn my final ranking, Response B was close.";
        assert_eq!(
            parse_ranking(text, &mapping(2)),
            Some(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_fallback_to_mentions() {
        let text = "FINAL RANKING: Response B, then Response A.";
        assert_eq!(
            parse_ranking(text, &mapping(2)),
            Some(vec!["B".to_string(), "A".to_string()])
        );
    }

    #[test]
    fn test_drops_unknown_and_repeated_labels() {
        let text = "FINAL RANKING:\n1. Response A\n2. Response Q\n3. Response A\n4. Response B";
        assert_eq!(
            parse_ranking(text, &mapping(2)),
            Some(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_missing_section_is_none() {
        assert_eq!(parse_ranking("Response A is best.", &mapping(2)), None);
        assert_eq!(parse_ranking("FINAL RANKING:\n(none)", &mapping(2)), None);
    }

    #[test]
    fn test_aggregate_average_positions() {
        let map = mapping(3);
        let reviews = vec![
            review("m1", Some(&["B", "A", "C"])),
            review("m2", Some(&["B", "C", "A"])),
            review("m3", Some(&["A", "B", "C"])),
            review("m4", None),
        ];

        let agg = aggregate_rankings(&reviews, &map);
        let order: Vec<_> = agg.iter().map(|r| r.model.as_str()).collect();
        assert_eq!(order, vec!["m2", "m1", "m3"]);
        assert!((agg[0].average_position - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(agg[0].votes, 3);
        assert!((agg[1].average_position - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_ties_break_by_label() {
        let map = mapping(2);
        let reviews = vec![review("m1", Some(&["B", "A"])), review("m2", Some(&["A", "B"]))];
        let agg = aggregate_rankings(&reviews, &map);
        assert_eq!(agg[0].label, "A");
        assert_eq!(agg[1].label, "B");
    }
}
