//! Windowed summaries over event snapshots.
//!
//! Pure functions: the engine queries a window from the store and hands
//! the slice here, so two calls over the same snapshot produce identical
//! results.

use crate::types::{AnalyticsResult, DailyCount, FoodEvent, NutrientSummary, StoolEvent};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Sum nutrient fields across food events.
///
/// Returns an all-zero summary with `meal_count = 0` on empty input;
/// never fails. Additive: summing the summaries of two disjoint
/// sub-windows equals the summary of the whole window.
pub fn summarize_foods(foods: &[FoodEvent]) -> NutrientSummary {
    let mut summary = NutrientSummary::default();

    for event in foods {
        summary.calories += event.nutrients.calories;
        summary.fiber += event.nutrients.fiber;
        summary.fat += event.nutrients.fat;
        summary.protein += event.nutrients.protein;
        summary.meal_count += 1;
    }

    summary
}

/// Build stool analytics for the window `[window_start, today]`.
///
/// `frequency_data` holds one entry per calendar day, both endpoints
/// inclusive, ascending, zero-count days included. The average is the
/// mean bristol value rounded to one decimal, absent when the window
/// holds no events.
pub fn summarize_stools(
    stools: &[StoolEvent],
    window_start: NaiveDate,
    today: NaiveDate,
) -> AnalyticsResult {
    let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
    for event in stools {
        *per_day.entry(event.logged_at.date_naive()).or_insert(0) += 1;
    }

    let mut frequency_data = Vec::new();
    let mut day = window_start;
    while day <= today {
        frequency_data.push(DailyCount {
            date: day,
            count: per_day.get(&day).copied().unwrap_or(0),
        });
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    let total_logs = stools.len() as u32;
    let average_bristol_score = if stools.is_empty() {
        None
    } else {
        let sum: u32 = stools.iter().map(|s| u32::from(s.bristol.value())).sum();
        Some(round1(f64::from(sum) / f64::from(total_logs)))
    };

    AnalyticsResult {
        frequency_data,
        average_bristol_score,
        total_logs,
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BristolType, NutrientVector, QuantityUnit};
    use chrono::{Duration, TimeZone, Utc};

    fn food(calories: f64, fiber: f64, fat: f64, protein: f64) -> FoodEvent {
        FoodEvent {
            id: 1,
            user_id: 1,
            food_name: "test".into(),
            quantity: 1.0,
            unit: QuantityUnit::Serving,
            nutrients: NutrientVector {
                calories,
                fiber,
                fat,
                protein,
            },
            eaten_at: Utc::now(),
        }
    }

    fn stool(bristol: u8, days_ago: i64) -> StoolEvent {
        StoolEvent {
            id: 1,
            user_id: 1,
            bristol: BristolType::new(bristol).unwrap(),
            bleeding: false,
            urgency: 3,
            notes: None,
            logged_at: Utc.with_ymd_and_hms(2026, 3, 20, 8, 30, 0).unwrap()
                - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_summarize_foods_sums_fields() {
        let foods = vec![
            food(700.0, 10.0, 20.0, 40.0),
            food(950.0, 8.0, 25.0, 50.0),
            food(500.0, 7.0, 15.0, 30.0),
        ];

        let summary = summarize_foods(&foods);
        assert_eq!(summary.calories, 2150.0);
        assert_eq!(summary.fiber, 25.0);
        assert_eq!(summary.fat, 60.0);
        assert_eq!(summary.protein, 120.0);
        assert_eq!(summary.meal_count, 3);
    }

    #[test]
    fn test_summarize_foods_empty_is_zero() {
        let summary = summarize_foods(&[]);
        assert_eq!(summary, NutrientSummary::default());
        assert_eq!(summary.meal_count, 0);
    }

    #[test]
    fn test_summarize_foods_additive_over_splits() {
        let foods: Vec<FoodEvent> = (1..=6)
            .map(|i| food(i as f64 * 100.0, i as f64, i as f64 * 2.0, i as f64 * 3.0))
            .collect();

        let whole = summarize_foods(&foods);
        let left = summarize_foods(&foods[..2]);
        let right = summarize_foods(&foods[2..]);

        assert_eq!(whole.calories, left.calories + right.calories);
        assert_eq!(whole.fiber, left.fiber + right.fiber);
        assert_eq!(whole.fat, left.fat + right.fat);
        assert_eq!(whole.protein, left.protein + right.protein);
        assert_eq!(whole.meal_count, left.meal_count + right.meal_count);
    }

    #[test]
    fn test_frequency_covers_every_day_inclusive() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let start = today - Duration::days(30);

        let result = summarize_stools(&[], start, today);

        assert_eq!(result.frequency_data.len(), 31);
        assert_eq!(result.frequency_data[0].date, start);
        assert_eq!(result.frequency_data[30].date, today);
        assert!(result.frequency_data.iter().all(|d| d.count == 0));
        assert!(result
            .frequency_data
            .windows(2)
            .all(|w| w[1].date == w[0].date.succ_opt().unwrap()));
    }

    #[test]
    fn test_empty_window_has_no_average() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let result = summarize_stools(&[], today - Duration::days(30), today);

        assert_eq!(result.total_logs, 0);
        assert_eq!(result.average_bristol_score, None);
    }

    #[test]
    fn test_counts_land_on_their_days() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let start = today - Duration::days(7);

        let stools = vec![stool(4, 0), stool(3, 0), stool(5, 2)];
        let result = summarize_stools(&stools, start, today);

        assert_eq!(result.total_logs, 3);
        let by_date: HashMap<NaiveDate, u32> = result
            .frequency_data
            .iter()
            .map(|d| (d.date, d.count))
            .collect();
        assert_eq!(by_date[&today], 2);
        assert_eq!(by_date[&(today - Duration::days(2))], 1);
        assert_eq!(by_date[&(today - Duration::days(1))], 0);
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let start = today - Duration::days(7);

        // Mean of 4, 4, 3 = 3.666... -> 3.7
        let stools = vec![stool(4, 0), stool(4, 1), stool(3, 2)];
        let result = summarize_stools(&stools, start, today);

        assert_eq!(result.average_bristol_score, Some(3.7));
        let avg = result.average_bristol_score.unwrap();
        assert!((1.0..=7.0).contains(&avg));
    }
}
