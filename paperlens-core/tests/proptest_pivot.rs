//! Property-based tests for the trend pivot using proptest.

use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

use paperlens_core::config::ColorAssignment;
use paperlens_core::trends::{Palette, pivot, pivot_with};
use paperlens_core::types::TrendRecord;

fn record() -> impl Strategy<Value = TrendRecord> {
    (2000i32..2030, "[a-e]{1,2}", 0u64..1000)
        .prop_map(|(year, topic, frequency)| TrendRecord::new(year, topic, frequency))
}

fn records() -> impl Strategy<Value = Vec<TrendRecord>> {
    prop::collection::vec(record(), 0..60)
}

// --- Shape properties ---

proptest! {
    #[test]
    fn pivot_is_rectangular(records in records()) {
        let result = pivot(&records);
        let topics = result.series.len();
        for row in result.matrix.rows() {
            prop_assert_eq!(row.values.len(), topics);
        }
        let years: BTreeSet<i32> = records.iter().map(|r| r.year).collect();
        prop_assert_eq!(result.matrix.rows().len(), years.len());
        prop_assert_eq!(result.matrix.cell_count(), years.len() * topics);
    }

    #[test]
    fn pivot_years_are_strictly_ascending(records in records()) {
        let years = pivot(&records).matrix.years();
        prop_assert!(years.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn pivot_topics_follow_first_appearance(records in records()) {
        let mut seen = HashSet::new();
        let expected: Vec<String> = records
            .iter()
            .filter(|r| seen.insert(r.topic.clone()))
            .map(|r| r.topic.clone())
            .collect();
        let actual: Vec<String> = pivot(&records).series.into_iter().map(|s| s.topic).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn pivot_is_deterministic(records in records()) {
        prop_assert_eq!(pivot(&records), pivot(&records));
    }
}

// --- Value properties ---

proptest! {
    #[test]
    fn pivot_first_duplicate_wins(records in records()) {
        let result = pivot(&records);
        for record in &records {
            let first = records
                .iter()
                .find(|r| r.year == record.year && r.topic == record.topic)
                .map(|r| r.frequency);
            prop_assert_eq!(result.matrix.value(record.year, &record.topic), first);
        }
    }

    #[test]
    fn pivot_missing_cells_are_zero(records in records()) {
        let result = pivot(&records);
        for row in result.matrix.rows() {
            for (topic, value) in &row.values {
                let present = records.iter().any(|r| r.year == row.year && &r.topic == topic);
                if !present {
                    prop_assert_eq!(*value, 0);
                }
            }
        }
    }
}

// --- Color properties ---

proptest! {
    #[test]
    fn first_seen_colors_cycle_through_palette(records in records()) {
        let palette = Palette::default();
        let result = pivot_with(&records, &palette);
        for (i, series) in result.series.iter().enumerate() {
            prop_assert_eq!(series.color, i % palette.len());
            prop_assert_eq!(series.stroke.as_str(), palette.color(series.color));
        }
    }

    #[test]
    fn topic_hash_colors_ignore_record_order(mut records in records()) {
        let palette = Palette::new(Vec::new(), ColorAssignment::TopicHash);
        let forward = pivot_with(&records, &palette);
        records.reverse();
        let backward = pivot_with(&records, &palette);
        for series in &forward.series {
            let other = backward.series.iter().find(|s| s.topic == series.topic);
            prop_assert_eq!(other.map(|s| s.color), Some(series.color));
        }
    }
}
