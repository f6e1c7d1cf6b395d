//! Batch aggregation: severity tiers, per-category stats, top category
//!
//! Pure function of the classified record set. Tier thresholds and weights
//! are policy constants; a lower score means a more severe record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::traits::Record;

/// Severity tier derived from a classifier score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    /// score < 0.3
    Critical,
    /// 0.3 <= score < 0.6
    High,
    /// score >= 0.6
    Normal,
}

impl SeverityTier {
    /// Classify a score into its tier
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            SeverityTier::Critical
        } else if score < 0.6 {
            SeverityTier::High
        } else {
            SeverityTier::Normal
        }
    }

    /// Priority weight contributed by a record in this tier
    pub fn weight(&self) -> f64 {
        match self {
            SeverityTier::Critical => 3.0,
            SeverityTier::High => 2.0,
            SeverityTier::Normal => 1.0,
        }
    }

    /// Stable name used in persisted stats maps
    pub fn name(&self) -> &'static str {
        match self {
            SeverityTier::Critical => "critical",
            SeverityTier::High => "high",
            SeverityTier::Normal => "normal",
        }
    }
}

/// Per-tier record counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub critical: u64,
    pub high: u64,
    pub normal: u64,
}

impl TierCounts {
    fn bump(&mut self, tier: SeverityTier) {
        match tier {
            SeverityTier::Critical => self.critical += 1,
            SeverityTier::High => self.high += 1,
            SeverityTier::Normal => self.normal += 1,
        }
    }

    /// Total records counted
    pub fn total(&self) -> u64 {
        self.critical + self.high + self.normal
    }
}

/// Aggregated stats for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Records in this category
    pub count: u64,

    /// Sum of member priority weights
    pub total_priority_score: f64,

    /// Mean of member priority *weights* (3/2/1), not of raw scores.
    /// The name is inherited from the upstream system; changing the
    /// computation would change top-category selection.
    pub average_severity: f64,

    /// Tier counts within the category
    pub tier_breakdown: TierCounts,
}

impl CategoryStats {
    /// Selection score: count x mean priority weight
    pub fn weighted_score(&self) -> f64 {
        self.count as f64 * self.average_severity
    }
}

/// Per-record annotation produced by aggregation, consumed by persistence
#[derive(Debug, Clone, Copy)]
pub struct RecordAnnotation {
    pub record_id: i64,
    pub tier: SeverityTier,
    pub priority_weight: f64,
}

/// Result of aggregating a classified record set
#[derive(Debug, Clone)]
pub struct AggregationResult {
    /// Tier and weight per record, in input order
    pub annotations: Vec<RecordAnnotation>,

    /// Stats per category, keyed by category name
    pub category_stats: BTreeMap<String, CategoryStats>,

    /// Tier counts across the whole batch
    pub tier_stats: TierCounts,

    /// Category with the highest weighted score; ties go to the
    /// lexicographically smallest name. `None` only for empty input.
    pub top_category: Option<String>,

    /// Sum of every record's priority weight
    pub total_priority_score: f64,
}

/// Aggregate classified records into batch statistics.
///
/// Records without a severity score contribute the neutral fallback tier
/// (the builder always classifies before aggregating, so this only matters
/// for direct callers).
pub fn aggregate(records: &[Record]) -> AggregationResult {
    let mut annotations = Vec::with_capacity(records.len());
    let mut category_stats: BTreeMap<String, CategoryStats> = BTreeMap::new();
    let mut tier_stats = TierCounts::default();
    let mut total_priority_score = 0.0;

    for record in records {
        let score = record.severity_score.unwrap_or(0.5);
        let tier = SeverityTier::from_score(score);
        let weight = tier.weight();

        annotations.push(RecordAnnotation {
            record_id: record.id,
            tier,
            priority_weight: weight,
        });

        tier_stats.bump(tier);
        total_priority_score += weight;

        let entry = category_stats
            .entry(record.category.clone())
            .or_insert_with(|| CategoryStats {
                count: 0,
                total_priority_score: 0.0,
                average_severity: 0.0,
                tier_breakdown: TierCounts::default(),
            });
        entry.count += 1;
        entry.total_priority_score += weight;
        entry.tier_breakdown.bump(tier);
    }

    for stats in category_stats.values_mut() {
        stats.average_severity = stats.total_priority_score / stats.count as f64;
    }

    // BTreeMap iterates in name order, so requiring a strictly greater score
    // makes the lexicographically smallest name win ties.
    let mut top_category: Option<(String, f64)> = None;
    for (name, stats) in &category_stats {
        let score = stats.weighted_score();
        match &top_category {
            Some((_, best)) if score <= *best => {}
            _ => top_category = Some((name.clone(), score)),
        }
    }

    AggregationResult {
        annotations,
        category_stats,
        tier_stats,
        top_category: top_category.map(|(name, _)| name),
        total_priority_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: i64, category: &str, score: f64) -> Record {
        Record {
            id,
            category: category.to_string(),
            severity_score: Some(score),
            text: format!("record {}", id),
            storage_ref: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(SeverityTier::from_score(0.0), SeverityTier::Critical);
        assert_eq!(SeverityTier::from_score(0.29), SeverityTier::Critical);
        assert_eq!(SeverityTier::from_score(0.3), SeverityTier::High);
        assert_eq!(SeverityTier::from_score(0.59), SeverityTier::High);
        assert_eq!(SeverityTier::from_score(0.6), SeverityTier::Normal);
        assert_eq!(SeverityTier::from_score(1.0), SeverityTier::Normal);
    }

    #[test]
    fn test_tier_weights() {
        assert_eq!(SeverityTier::Critical.weight(), 3.0);
        assert_eq!(SeverityTier::High.weight(), 2.0);
        assert_eq!(SeverityTier::Normal.weight(), 1.0);
    }

    #[test]
    fn test_single_category_aggregation() {
        // Severities [0.1, 0.4, 0.8] -> tiers [critical, high, normal],
        // weights [3, 2, 1], total 6, average 2.0
        let records = vec![
            record(1, "fraud", 0.1),
            record(2, "fraud", 0.4),
            record(3, "fraud", 0.8),
        ];
        let result = aggregate(&records);

        assert_eq!(result.annotations[0].tier, SeverityTier::Critical);
        assert_eq!(result.annotations[1].tier, SeverityTier::High);
        assert_eq!(result.annotations[2].tier, SeverityTier::Normal);
        assert_eq!(result.total_priority_score, 6.0);

        let stats = &result.category_stats["fraud"];
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total_priority_score, 6.0);
        assert_eq!(stats.average_severity, 2.0);
        assert_eq!(stats.tier_breakdown.critical, 1);
        assert_eq!(stats.tier_breakdown.high, 1);
        assert_eq!(stats.tier_breakdown.normal, 1);

        assert_eq!(result.top_category.as_deref(), Some("fraud"));
    }

    #[test]
    fn test_top_category_weighted_not_largest() {
        // A: 2 records, all critical -> weighted 2 * 3.0 = 6
        // B: 5 records, all normal  -> weighted 5 * 1.0 = 5
        let mut records = vec![record(1, "A", 0.1), record(2, "A", 0.1)];
        for id in 3..8 {
            records.push(record(id, "B", 0.9));
        }

        let result = aggregate(&records);
        assert_eq!(result.top_category.as_deref(), Some("A"));
    }

    #[test]
    fn test_top_category_tie_breaks_lexicographically() {
        // Both categories score 1 * 3.0 = 3
        let records = vec![record(1, "zeta", 0.1), record(2, "alpha", 0.1)];
        let result = aggregate(&records);
        assert_eq!(result.top_category.as_deref(), Some("alpha"));
    }

    #[test]
    fn test_empty_input() {
        let result = aggregate(&[]);
        assert!(result.top_category.is_none());
        assert!(result.annotations.is_empty());
        assert_eq!(result.total_priority_score, 0.0);
        assert_eq!(result.tier_stats.total(), 0);
    }

    #[test]
    fn test_unclassified_record_uses_neutral_fallback() {
        let mut r = record(1, "spam", 0.0);
        r.severity_score = None;
        let result = aggregate(&[r]);
        // 0.5 falls in the high tier
        assert_eq!(result.annotations[0].tier, SeverityTier::High);
        assert_eq!(result.tier_stats.high, 1);
    }

    #[test]
    fn test_global_tier_stats() {
        let records = vec![
            record(1, "a", 0.1),
            record(2, "b", 0.2),
            record(3, "c", 0.5),
            record(4, "d", 0.9),
        ];
        let result = aggregate(&records);
        assert_eq!(result.tier_stats.critical, 2);
        assert_eq!(result.tier_stats.high, 1);
        assert_eq!(result.tier_stats.normal, 1);
        assert_eq!(result.tier_stats.total(), 4);
    }

    #[test]
    fn test_tier_serde_names() {
        let json = serde_json::to_string(&SeverityTier::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }
}
