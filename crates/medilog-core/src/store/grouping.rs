//! Time bucketing of a person's records.

use std::sync::Arc;

use chrono::Datelike;

use crate::models::{Record, RecordsGroupByTime, Timestamp};

/// Split newest-first records into runs without multi-day gaps.
///
/// A new group starts at the first record and whenever the calendar dates
/// of two neighbouring records are more than one day apart. Inside a group a
/// `None` separator precedes a record whose weekday differs from the
/// previous record's; a group never starts with a separator.
///
/// `to` is the first (newest) time of a group and `from` the last (oldest).
pub fn group_by_periods(records: &[Arc<Record>]) -> Vec<RecordsGroupByTime> {
    let mut groups: Vec<RecordsGroupByTime> = Vec::new();
    let mut prev: Option<Timestamp> = None;

    for record in records {
        let time = record.datetime;

        let gap = prev.map(|p| day_gap(&p, &time));
        if gap.map_or(true, |days| days > 1) {
            groups.push(RecordsGroupByTime {
                from: None,
                to: time,
                records: Vec::new(),
            });
        }

        if let Some(group) = groups.last_mut() {
            // Weekday, not date: matches the observed separator behaviour
            let day_changed = prev.is_some_and(|p| p.weekday() != time.weekday());
            if day_changed && !group.records.is_empty() {
                group.records.push(None);
            }
            group.records.push(Some(Arc::clone(record)));
            group.from = Some(time);
        }

        prev = Some(time);
    }

    groups
}

/// Whole calendar days between two times, in household local dates.
fn day_gap(newer: &Timestamp, older: &Timestamp) -> i64 {
    (newer.date_naive() - older.date_naive()).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_timestamp;
    use chrono::FixedOffset;

    fn record(at: &str) -> Arc<Record> {
        let offset = FixedOffset::east_opt(0).unwrap();
        Arc::new(Record::new(parse_timestamp(at, offset).unwrap()))
    }

    fn times(group: &RecordsGroupByTime) -> Vec<Option<String>> {
        group
            .records
            .iter()
            .map(|r| r.as_ref().map(|r| r.datetime.format("%m-%d %H:%M").to_string()))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_periods(&[]).is_empty());
    }

    #[test]
    fn test_gap_of_more_than_one_day_splits() {
        let records = vec![
            record("2024-01-03T09:00:00Z"),
            record("2024-01-01T23:00:00Z"),
            record("2024-01-01T10:00:00Z"),
        ];
        let groups = group_by_periods(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(times(&groups[0]), vec![Some("01-03 09:00".into())]);
        assert_eq!(
            times(&groups[1]),
            vec![Some("01-01 23:00".into()), Some("01-01 10:00".into())]
        );
        assert_eq!(groups[1].to, records[1].datetime);
        assert_eq!(groups[1].from, Some(records[2].datetime));
    }

    #[test]
    fn test_next_day_inserts_separator() {
        let records = vec![
            record("2024-01-02T08:00:00Z"),
            record("2024-01-01T22:00:00Z"),
            record("2024-01-01T07:00:00Z"),
        ];
        let groups = group_by_periods(&records);

        assert_eq!(groups.len(), 1);
        assert_eq!(
            times(&groups[0]),
            vec![
                Some("01-02 08:00".into()),
                None,
                Some("01-01 22:00".into()),
                Some("01-01 07:00".into()),
            ]
        );
        assert_eq!(groups[0].record_count(), 3);
    }

    #[test]
    fn test_two_dates_apart_splits_within_25_hours() {
        let records = vec![record("2024-01-03T00:30:00Z"), record("2024-01-01T23:30:00Z")];
        let groups = group_by_periods(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(times(&groups[0]), vec![Some("01-03 00:30".into())]);
        assert_eq!(times(&groups[1]), vec![Some("01-01 23:30".into())]);
    }

    #[test]
    fn test_single_record_group() {
        let records = vec![record("2024-05-05T05:05:00Z")];
        let groups = group_by_periods(&records);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].from, Some(groups[0].to));
    }

    #[test]
    fn test_household_offset_moves_day_boundary() {
        // 23:30Z and 00:30Z the next day share a local date at +02:00
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let records = vec![
            Arc::new(Record::new(parse_timestamp("2024-03-02T00:30:00Z", offset).unwrap())),
            Arc::new(Record::new(parse_timestamp("2024-03-01T23:30:00Z", offset).unwrap())),
        ];
        let groups = group_by_periods(&records);

        assert_eq!(groups.len(), 1);
        assert!(groups[0].records.iter().all(Option::is_some));
    }
}
