//! Property tests for usage aggregation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeDelta};
use medilog_core::{Medication, Record};
use medilog_insights::UsageAggregator;
use proptest::prelude::*;

const IDS: [&str; 3] = ["a", "b", "c"];

fn names() -> HashMap<String, Medication> {
    IDS.iter()
        .map(|id| (id.to_string(), Medication::new(*id, id.to_uppercase())))
        .collect()
}

/// Records spread over roughly three years, each either a dose of one of
/// `IDS` or a temperature reading.
fn records_from(entries: &[(i64, Option<usize>)]) -> Vec<Arc<Record>> {
    let utc = FixedOffset::east_opt(0).unwrap();
    let base = DateTime::parse_from_rfc3339("2023-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&utc);

    entries
        .iter()
        .map(|(minutes, medication)| {
            let record = Record::new(base + TimeDelta::minutes(*minutes));
            Arc::new(match medication {
                Some(i) => record.with_medication(IDS[*i], None),
                None => record.with_temperature(37.5),
            })
        })
        .collect()
}

proptest! {
    #[test]
    fn year_level_counts_every_dose_once(
        entries in prop::collection::vec(
            (0i64..3 * 365 * 24 * 60, prop::option::of(0usize..3)),
            0..60,
        ),
    ) {
        let records = records_from(&entries);
        let view = UsageAggregator::new().view(&records, &names());

        let doses = entries.iter().filter(|(_, m)| m.is_some()).count();
        let counted: usize = view.stats.iter().map(|s| s.total()).sum();
        prop_assert_eq!(counted, doses);

        let max = view.stats.iter().flat_map(|s| s.counts.values()).copied().max().unwrap_or(0);
        prop_assert_eq!(view.max_count, max);

        for stats in &view.stats {
            for key in stats.counts.keys() {
                prop_assert!(view.columns.iter().any(|c| c.key == *key));
            }
        }
    }

    #[test]
    fn drilling_into_a_year_keeps_its_total(
        entries in prop::collection::vec(
            (0i64..3 * 365 * 24 * 60, prop::option::of(0usize..3)),
            1..60,
        ),
    ) {
        let records = records_from(&entries);
        let names = names();
        let mut usage = UsageAggregator::new();
        let years = usage.view(&records, &names);

        for column in &years.columns {
            let year_total: usize = years.stats.iter().map(|s| s.count(column.key)).sum();

            prop_assert!(usage.drill_down(column.key));
            let months = usage.view(&records, &names);
            let month_total: usize = months.stats.iter().map(|s| s.total()).sum();
            prop_assert_eq!(month_total, year_total);
            prop_assert!(usage.go_back());
        }
    }
}
