use chrono::Duration;

use crate::models::{EntityCounters, Filter, Severity, TargetComparison, Targets};

/// Days covered by the filter, inclusive of both endpoints. An unbounded
/// filter scales targets by a single day: "all time" views compare against
/// the raw daily rate rather than some invented horizon.
pub fn range_days(filter: &Filter) -> i64 {
    match filter.bounds() {
        Some((start, end)) => (end - start).num_days() + 1,
        None => 1,
    }
}

/// Scale a per-day target to the range and classify actual-vs-target.
/// A missing or zero target yields no ratio and no severity; the caller
/// shows the actual alone.
pub fn compare(actual: i64, daily_target: Option<f64>, range_days: i64) -> TargetComparison {
    let target = daily_target.unwrap_or(0.0) * range_days as f64;
    if target <= 0.0 {
        return TargetComparison {
            actual,
            target,
            ratio_pct: None,
            severity: None,
        };
    }
    let ratio_pct = actual as f64 / target * 100.0;
    let severity = if ratio_pct >= 95.0 {
        Severity::Green
    } else if ratio_pct >= 75.0 {
        Severity::Yellow
    } else {
        Severity::Red
    };
    TargetComparison {
        actual,
        target,
        ratio_pct: Some(ratio_pct),
        severity: Some(severity),
    }
}

/// Convenience bundle for the quick view: one comparison per targeted metric.
pub fn compare_all(
    counters: &EntityCounters,
    targets: &Targets,
    range_days: i64,
) -> (
    TargetComparison,
    TargetComparison,
    TargetComparison,
    TargetComparison,
) {
    (
        compare(counters.emails_sent, targets.emails_per_day, range_days),
        compare(
            counters.prospects_contacted,
            targets.prospects_per_day,
            range_days,
        ),
        compare(counters.real_replies, targets.replies_per_day, range_days),
        compare(counters.meetings, targets.meetings_per_day, range_days),
    )
}

/// The immediately-preceding window of identical length: no gap, no overlap.
/// Unbounded filters have no meaningful previous period.
pub fn previous_period(filter: &Filter) -> Option<Filter> {
    let (start, end) = filter.bounds()?;
    let period_days = (end - start).num_days() + 1;
    let prev_end = start - Duration::days(1);
    let prev_start = prev_end - Duration::days(period_days - 1);
    Some(filter.with_bounds(prev_start, prev_end))
}

/// Percent change vs the previous period. A zero or absent baseline gives
/// None ("no comparison available"), never infinity.
pub fn delta_pct(current: i64, previous: Option<i64>) -> Option<f64> {
    match previous {
        Some(prev) if prev > 0 => Some((current - prev) as f64 / prev as f64 * 100.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn range_days_is_inclusive_of_both_endpoints() {
        let filter = Filter::new(None, None, Some(date(2024, 3, 8)), Some(date(2024, 3, 14)));
        assert_eq!(range_days(&filter), 7);
    }

    #[test]
    fn unbounded_filter_scales_by_one_day() {
        assert_eq!(range_days(&Filter::default()), 1);
    }

    #[test]
    fn zero_actual_against_target_is_red() {
        let result = compare(0, Some(10.0), 5);
        assert_eq!(result.target, 50.0);
        assert_eq!(result.ratio_pct, Some(0.0));
        assert_eq!(result.severity, Some(Severity::Red));
    }

    #[test]
    fn ninety_six_percent_is_green() {
        let result = compare(48, Some(10.0), 5);
        assert_eq!(result.target, 50.0);
        assert_eq!(result.ratio_pct, Some(96.0));
        assert_eq!(result.severity, Some(Severity::Green));
    }

    #[test]
    fn mid_band_is_yellow() {
        let result = compare(40, Some(10.0), 5);
        assert_eq!(result.severity, Some(Severity::Yellow));
    }

    #[test]
    fn no_target_means_no_classification() {
        let result = compare(40, None, 5);
        assert_eq!(result.ratio_pct, None);
        assert_eq!(result.severity, None);
        let zeroed = compare(40, Some(0.0), 5);
        assert_eq!(zeroed.severity, None);
    }

    #[test]
    fn previous_period_is_adjacent_and_equal_length() {
        let filter = Filter::new(None, None, Some(date(2024, 3, 8)), Some(date(2024, 3, 14)));
        let previous = previous_period(&filter).unwrap();
        assert_eq!(
            previous.bounds(),
            Some((date(2024, 3, 1), date(2024, 3, 7)))
        );
    }

    #[test]
    fn previous_period_keeps_entity_scope() {
        let filter = Filter::new(
            Some("Acme".to_string()),
            None,
            Some(date(2024, 3, 8)),
            Some(date(2024, 3, 14)),
        );
        let previous = previous_period(&filter).unwrap();
        assert_eq!(previous.client(), Some("Acme"));
    }

    #[test]
    fn unbounded_filter_has_no_previous_period() {
        assert!(previous_period(&Filter::default()).is_none());
    }

    #[test]
    fn delta_needs_a_nonzero_baseline() {
        assert_eq!(delta_pct(150, Some(100)), Some(50.0));
        assert_eq!(delta_pct(50, Some(100)), Some(-50.0));
        assert_eq!(delta_pct(50, Some(0)), None);
        assert_eq!(delta_pct(50, None), None);
    }
}
