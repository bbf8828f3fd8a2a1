//! Progress statistics derived from the stored collections.
//!
//! Everything here is a pure function of its inputs:
//! - Weekly and monthly calorie averages over daily entries
//! - Weight change against a lookback point
//! - The logging streak anchored at today
//!
//! No function in this module can fail; missing data degrades to zero or
//! leaves the previous value in place.

use crate::{DailyEntry, ProgressStats, WeightEntry};
use chrono::{DateTime, Days, Local, Months, NaiveDate};

/// Instant seven calendar days before `at`
pub fn week_before(at: DateTime<Local>) -> DateTime<Local> {
    at.checked_sub_days(Days::new(7)).unwrap_or(at)
}

/// Instant one calendar month before `at`
pub fn month_before(at: DateTime<Local>) -> DateTime<Local> {
    at.checked_sub_months(Months::new(1)).unwrap_or(at)
}

/// Mean daily calories over entries dated at or after `cutoff`.
///
/// Returns 0.0 when no entry falls in range.
pub fn average_calories_since(entries: &[DailyEntry], cutoff: DateTime<Local>) -> f64 {
    let (sum, count) = entries
        .iter()
        .filter(|e| e.date >= cutoff)
        .fold((0u64, 0u32), |(sum, count), e| {
            (sum + u64::from(e.total_calories()), count + 1)
        });

    if count == 0 {
        0.0
    } else {
        sum as f64 / f64::from(count)
    }
}

/// Change from the last weight at or before `lookback(latest.date)` to the latest weight.
///
/// Returns `None` with fewer than two entries or when nothing is old enough
/// to compare against.
pub fn weight_change(
    weights: &[WeightEntry],
    lookback: impl Fn(DateTime<Local>) -> DateTime<Local>,
) -> Option<f64> {
    if weights.len() < 2 {
        return None;
    }

    let mut sorted: Vec<&WeightEntry> = weights.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let latest = sorted.last()?;
    let cutoff = lookback(latest.date);
    let reference = sorted.iter().rev().find(|w| w.date <= cutoff)?;

    Some(latest.weight - reference.weight)
}

/// Consecutive days ending at `today` with a nonzero calorie total.
///
/// A missing or empty entry on any day, today included, ends the streak.
pub fn streak_days(entries: &[DailyEntry], today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = Some(today);

    while let Some(current) = day {
        let logged = entries
            .iter()
            .find(|e| e.day() == current)
            .is_some_and(|e| e.total_calories() > 0);
        if !logged {
            break;
        }
        streak += 1;
        day = current.pred_opt();
    }

    streak
}

/// Recompute all statistics.
///
/// Weight deltas without a comparison point keep their value from `previous`.
pub fn compute(
    previous: &ProgressStats,
    entries: &[DailyEntry],
    weights: &[WeightEntry],
    now: DateTime<Local>,
) -> ProgressStats {
    let stats = ProgressStats {
        weekly_average_calories: average_calories_since(entries, week_before(now)),
        monthly_average_calories: average_calories_since(entries, month_before(now)),
        weekly_weight_change: weight_change(weights, week_before)
            .unwrap_or(previous.weekly_weight_change),
        monthly_weight_change: weight_change(weights, month_before)
            .unwrap_or(previous.monthly_weight_change),
        streak_days: streak_days(entries, now.date_naive()),
    };

    tracing::debug!(
        "Recomputed stats: weekly avg {:.1}, monthly avg {:.1}, streak {}",
        stats.weekly_average_calories,
        stats.monthly_average_calories,
        stats.streak_days
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::local_midnight;
    use crate::FoodItem;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()
    }

    fn noon_today() -> DateTime<Local> {
        local_midnight(today()) + Duration::hours(12)
    }

    fn entry(days_ago: u64, calories: &[u32]) -> DailyEntry {
        let day = today().checked_sub_days(Days::new(days_ago)).unwrap();
        let mut entry = DailyEntry::new(local_midnight(day));
        for (i, kcal) in calories.iter().enumerate() {
            entry
                .food_items
                .push(FoodItem::new(format!("item {}", i), *kcal, 0, 0, 0));
        }
        entry
    }

    fn weight(days_ago: i64, kg: f64) -> WeightEntry {
        WeightEntry::new(noon_today() - Duration::days(days_ago), kg)
    }

    #[test]
    fn test_weekly_average() {
        let entries = vec![entry(0, &[1800]), entry(2, &[1000, 1000]), entry(5, &[2200])];
        let avg = average_calories_since(&entries, week_before(noon_today()));
        assert_eq!(avg, 2000.0);
    }

    #[test]
    fn test_average_empty_range_is_zero() {
        assert_eq!(average_calories_since(&[], week_before(noon_today())), 0.0);

        let old = vec![entry(30, &[2500])];
        assert_eq!(average_calories_since(&old, week_before(noon_today())), 0.0);
    }

    #[test]
    fn test_monthly_average_includes_older_days() {
        let entries = vec![entry(1, &[2000]), entry(20, &[1000]), entry(45, &[9000])];
        let monthly = average_calories_since(&entries, month_before(noon_today()));
        assert_eq!(monthly, 1500.0);
    }

    #[test]
    fn test_streak_counts_contiguous_days() {
        let entries = vec![entry(0, &[500]), entry(1, &[700]), entry(2, &[300]), entry(3, &[])];
        assert_eq!(streak_days(&entries, today()), 3);
    }

    #[test]
    fn test_streak_gap_today_is_zero() {
        let entries = vec![entry(1, &[700]), entry(2, &[300])];
        assert_eq!(streak_days(&entries, today()), 0);

        let empty_today = vec![entry(0, &[]), entry(1, &[700])];
        assert_eq!(streak_days(&empty_today, today()), 0);
    }

    #[test]
    fn test_streak_stops_at_gap() {
        let entries = vec![entry(0, &[500]), entry(2, &[300]), entry(3, &[300])];
        assert_eq!(streak_days(&entries, today()), 1);
    }

    #[test]
    fn test_weight_change_needs_two_entries() {
        assert_eq!(weight_change(&[weight(0, 80.0)], week_before), None);
    }

    #[test]
    fn test_weekly_weight_change() {
        let weights = vec![weight(10, 82.0), weight(8, 81.5), weight(3, 81.0), weight(0, 80.5)];
        let change = weight_change(&weights, week_before).unwrap();
        assert!((change - (80.5 - 81.5)).abs() < 1e-9);
    }

    #[test]
    fn test_weight_change_without_comparison_point() {
        let weights = vec![weight(3, 81.0), weight(0, 80.5)];
        assert_eq!(weight_change(&weights, week_before), None);
    }

    #[test]
    fn test_weight_change_unsorted_input() {
        let weights = vec![weight(0, 79.0), weight(40, 84.0), weight(7, 80.0)];
        let weekly = weight_change(&weights, week_before).unwrap();
        let monthly = weight_change(&weights, month_before).unwrap();
        assert!((weekly - -1.0).abs() < 1e-9);
        assert!((monthly - -5.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_retains_previous_weight_change() {
        let previous = ProgressStats {
            weekly_weight_change: -0.7,
            monthly_weight_change: -2.0,
            ..Default::default()
        };
        let weights = vec![weight(2, 81.0), weight(0, 80.5)];

        let stats = compute(&previous, &[], &weights, noon_today());
        assert_eq!(stats.weekly_weight_change, -0.7);
        assert_eq!(stats.monthly_weight_change, -2.0);
        assert_eq!(stats.weekly_average_calories, 0.0);
        assert_eq!(stats.streak_days, 0);
    }

    #[test]
    fn test_compute_full() {
        let entries = vec![entry(0, &[1800]), entry(1, &[2000]), entry(2, &[2200])];
        let weights = vec![weight(9, 82.0), weight(0, 81.0)];

        let stats = compute(&ProgressStats::default(), &entries, &weights, noon_today());
        assert_eq!(stats.weekly_average_calories, 2000.0);
        assert_eq!(stats.monthly_average_calories, 2000.0);
        assert!((stats.weekly_weight_change - -1.0).abs() < 1e-9);
        assert_eq!(stats.monthly_weight_change, 0.0);
        assert_eq!(stats.streak_days, 3);
    }
}
