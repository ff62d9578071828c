//! Next-stool classification from recent nutrient intake.
//!
//! A from-scratch nearest-centroid classifier, recalibrated from the
//! user's own event history on every call. No model state is persisted;
//! the training set is re-derived each time, so predictions self-update
//! as new events arrive.

use crate::aggregate::summarize_foods;
use crate::config::PredictorConfig;
use crate::types::{BristolType, FoodEvent, NutrientSummary, StoolEvent};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One (nutrient summary -> observed bristol type) training observation
#[derive(Clone, Debug)]
pub struct Pairing {
    pub summary: NutrientSummary,
    pub bristol: BristolType,
}

/// Start of the lookback window that ends at `end`: the prior stool
/// event's time when one exists, else a fixed trailing duration
fn window_start(
    prev_stool: Option<&StoolEvent>,
    end: DateTime<Utc>,
    fallback: Duration,
) -> DateTime<Utc> {
    prev_stool.map(|s| s.logged_at).unwrap_or(end - fallback)
}

/// Associate each stool event with the nutrient summary of food eaten in
/// its lookback window, producing the (features -> label) training set.
///
/// Both slices must be ascending by timestamp (the store's query order).
/// Stools whose window holds no food are skipped: an all-zero feature
/// vector would be fabricated data, not an observation.
pub fn build_pairings(
    foods: &[FoodEvent],
    stools: &[StoolEvent],
    fallback: Duration,
) -> Vec<Pairing> {
    let mut pairings = Vec::new();

    for (idx, stool) in stools.iter().enumerate() {
        let start = window_start(idx.checked_sub(1).map(|i| &stools[i]), stool.logged_at, fallback);

        let window: Vec<FoodEvent> = foods
            .iter()
            .filter(|f| f.eaten_at > start && f.eaten_at <= stool.logged_at)
            .cloned()
            .collect();

        let summary = summarize_foods(&window);
        if summary.meal_count == 0 {
            tracing::debug!(
                "Skipping stool event {} with no food in its lookback window",
                stool.id
            );
            continue;
        }

        pairings.push(Pairing {
            summary,
            bristol: stool.bristol,
        });
    }

    tracing::debug!(
        "Built {} pairings from {} stool events",
        pairings.len(),
        stools.len()
    );
    pairings
}

/// Summarize food intake over the lookback window ending at `now`
/// (since the most recent stool event, else the fallback duration)
pub fn current_window_summary(
    foods: &[FoodEvent],
    stools: &[StoolEvent],
    now: DateTime<Utc>,
    fallback: Duration,
) -> NutrientSummary {
    let start = window_start(stools.last(), now, fallback);

    let window: Vec<FoodEvent> = foods
        .iter()
        .filter(|f| f.eaten_at > start && f.eaten_at <= now)
        .cloned()
        .collect();

    summarize_foods(&window)
}

fn features(summary: &NutrientSummary) -> [f64; 4] {
    [
        summary.calories,
        summary.fiber,
        summary.fat,
        summary.protein,
    ]
}

/// Per-class mean feature vector with its supporting observation count
#[derive(Clone, Debug)]
struct Centroid {
    bristol: BristolType,
    mean: [f64; 4],
    support: usize,
}

/// Classify the current nutrient summary by nearest centroid.
///
/// Each feature dimension is scaled by its standard deviation across the
/// whole training set (floored to avoid near-zero-variance blowup).
/// Ties go to the centroid with more supporting observations, then to
/// the smaller type number; the result is fully deterministic.
pub fn classify(
    pairings: &[Pairing],
    current: &NutrientSummary,
    config: &PredictorConfig,
) -> Result<BristolType> {
    if pairings.len() < config.min_training_pairs {
        return Err(Error::InsufficientData {
            have: pairings.len(),
            need: config.min_training_pairs,
        });
    }

    let scale = dimension_scale(pairings, config.std_dev_floor);
    let centroids = build_centroids(pairings);

    let point = features(current);
    let mut ranked: Vec<(f64, &Centroid)> = centroids
        .iter()
        .map(|c| (scaled_distance(&point, &c.mean, &scale), c))
        .collect();

    ranked.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then(b.1.support.cmp(&a.1.support))
            .then(a.1.bristol.cmp(&b.1.bristol))
    });

    // Non-empty: the pairing count was checked above
    let (distance, best) = ranked
        .first()
        .ok_or_else(|| Error::InsufficientData {
            have: 0,
            need: config.min_training_pairs,
        })?;

    tracing::info!(
        "Nearest centroid: type {} (distance {:.3}, {} observations)",
        best.bristol,
        distance,
        best.support
    );

    Ok(best.bristol)
}

/// Per-dimension standard deviation across the whole training set,
/// floored so a flat dimension cannot dominate the distance
fn dimension_scale(pairings: &[Pairing], floor: f64) -> [f64; 4] {
    let n = pairings.len() as f64;

    let mut mean = [0.0f64; 4];
    for p in pairings {
        let f = features(&p.summary);
        for d in 0..4 {
            mean[d] += f[d];
        }
    }
    for d in 0..4 {
        mean[d] /= n;
    }

    let mut variance = [0.0f64; 4];
    for p in pairings {
        let f = features(&p.summary);
        for d in 0..4 {
            let delta = f[d] - mean[d];
            variance[d] += delta * delta;
        }
    }

    let mut scale = [0.0f64; 4];
    for d in 0..4 {
        scale[d] = (variance[d] / n).sqrt().max(floor);
    }
    scale
}

fn build_centroids(pairings: &[Pairing]) -> Vec<Centroid> {
    let mut sums: HashMap<BristolType, ([f64; 4], usize)> = HashMap::new();

    for p in pairings {
        let f = features(&p.summary);
        let (sum, count) = sums.entry(p.bristol).or_insert(([0.0; 4], 0));
        for d in 0..4 {
            sum[d] += f[d];
        }
        *count += 1;
    }

    let mut centroids: Vec<Centroid> = sums
        .into_iter()
        .map(|(bristol, (sum, count))| {
            let mut mean = [0.0; 4];
            for d in 0..4 {
                mean[d] = sum[d] / count as f64;
            }
            Centroid {
                bristol,
                mean,
                support: count,
            }
        })
        .collect();

    // Stable iteration order for the tie-break sort
    centroids.sort_by_key(|c| c.bristol);
    centroids
}

fn scaled_distance(a: &[f64; 4], b: &[f64; 4], scale: &[f64; 4]) -> f64 {
    let mut sum = 0.0;
    for d in 0..4 {
        let delta = (a[d] - b[d]) / scale[d];
        sum += delta * delta;
    }
    sum.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NutrientVector, QuantityUnit};
    use chrono::{TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn food_at(hours: i64, nutrients: NutrientVector) -> FoodEvent {
        FoodEvent {
            id: hours as u64 + 1,
            user_id: 1,
            food_name: "test".into(),
            quantity: 1.0,
            unit: QuantityUnit::Serving,
            nutrients,
            eaten_at: base_time() + Duration::hours(hours),
        }
    }

    fn stool_at(hours: i64, bristol: u8) -> StoolEvent {
        StoolEvent {
            id: hours as u64 + 1,
            user_id: 1,
            bristol: BristolType::new(bristol).unwrap(),
            bleeding: false,
            urgency: 3,
            notes: None,
            logged_at: base_time() + Duration::hours(hours),
        }
    }

    fn summary(calories: f64, fiber: f64, fat: f64, protein: f64) -> NutrientSummary {
        NutrientSummary {
            calories,
            fiber,
            fat,
            protein,
            meal_count: 1,
        }
    }

    fn pairing(calories: f64, fiber: f64, fat: f64, protein: f64, bristol: u8) -> Pairing {
        Pairing {
            summary: summary(calories, fiber, fat, protein),
            bristol: BristolType::new(bristol).unwrap(),
        }
    }

    fn relaxed_config() -> PredictorConfig {
        PredictorConfig {
            min_training_pairs: 1,
            ..PredictorConfig::default()
        }
    }

    #[test]
    fn test_pairing_includes_day_of_meals() {
        // Three meals totaling {2150, 25, 60, 120}, then a type 4 stool
        let foods = vec![
            food_at(
                1,
                NutrientVector {
                    calories: 700.0,
                    fiber: 10.0,
                    fat: 20.0,
                    protein: 40.0,
                },
            ),
            food_at(
                5,
                NutrientVector {
                    calories: 950.0,
                    fiber: 8.0,
                    fat: 25.0,
                    protein: 50.0,
                },
            ),
            food_at(
                9,
                NutrientVector {
                    calories: 500.0,
                    fiber: 7.0,
                    fat: 15.0,
                    protein: 30.0,
                },
            ),
        ];
        let stools = vec![stool_at(12, 4)];

        let pairings = build_pairings(&foods, &stools, Duration::hours(24));

        assert_eq!(pairings.len(), 1);
        assert_eq!(pairings[0].bristol.value(), 4);
        assert_eq!(pairings[0].summary.calories, 2150.0);
        assert_eq!(pairings[0].summary.fiber, 25.0);
        assert_eq!(pairings[0].summary.fat, 60.0);
        assert_eq!(pairings[0].summary.protein, 120.0);
        assert_eq!(pairings[0].summary.meal_count, 3);
    }

    #[test]
    fn test_windows_are_bounded_by_prior_stool() {
        let foods = vec![
            food_at(1, NutrientVector { calories: 100.0, ..Default::default() }),
            food_at(10, NutrientVector { calories: 200.0, ..Default::default() }),
        ];
        let stools = vec![stool_at(5, 3), stool_at(12, 5)];

        let pairings = build_pairings(&foods, &stools, Duration::hours(24));

        assert_eq!(pairings.len(), 2);
        // First window catches only the first meal, second only the later one
        assert_eq!(pairings[0].summary.calories, 100.0);
        assert_eq!(pairings[1].summary.calories, 200.0);
    }

    #[test]
    fn test_first_stool_uses_fallback_window() {
        // Food 30 hours before the stool falls outside a 24h fallback
        let foods = vec![food_at(
            0,
            NutrientVector {
                calories: 100.0,
                ..Default::default()
            },
        )];
        let stools = vec![stool_at(30, 4)];

        let pairings = build_pairings(&foods, &stools, Duration::hours(24));
        assert!(pairings.is_empty());

        let pairings = build_pairings(&foods, &stools, Duration::hours(48));
        assert_eq!(pairings.len(), 1);
    }

    #[test]
    fn test_stools_without_food_are_skipped() {
        let foods = vec![food_at(
            1,
            NutrientVector {
                calories: 100.0,
                ..Default::default()
            },
        )];
        let stools = vec![stool_at(5, 4), stool_at(8, 6)];

        let pairings = build_pairings(&foods, &stools, Duration::hours(24));

        // Second stool's window (5h..8h) holds no food
        assert_eq!(pairings.len(), 1);
        assert_eq!(pairings[0].bristol.value(), 4);
    }

    #[test]
    fn test_current_window_summary_since_last_stool() {
        let foods = vec![
            food_at(1, NutrientVector { calories: 100.0, ..Default::default() }),
            food_at(10, NutrientVector { calories: 250.0, ..Default::default() }),
        ];
        let stools = vec![stool_at(5, 4)];
        let now = base_time() + Duration::hours(12);

        let current = current_window_summary(&foods, &stools, now, Duration::hours(24));
        assert_eq!(current.meal_count, 1);
        assert_eq!(current.calories, 250.0);
    }

    #[test]
    fn test_too_few_pairs_is_an_error() {
        let pairings: Vec<Pairing> = (0..19)
            .map(|i| pairing(1000.0 + i as f64, 10.0, 30.0, 60.0, 4))
            .collect();

        let result = classify(&pairings, &summary(1000.0, 10.0, 30.0, 60.0), &PredictorConfig::default());
        assert!(matches!(
            result,
            Err(Error::InsufficientData { have: 19, need: 20 })
        ));
    }

    #[test]
    fn test_classifies_by_nearest_centroid() {
        // Two clusters: high fiber days end type 4, low fiber days type 2
        let mut pairings = Vec::new();
        for i in 0..10 {
            pairings.push(pairing(1800.0 + i as f64 * 10.0, 30.0, 50.0, 90.0, 4));
            pairings.push(pairing(2200.0 + i as f64 * 10.0, 5.0, 80.0, 70.0, 2));
        }

        let config = PredictorConfig::default();

        let high_fiber = summary(1850.0, 28.0, 55.0, 88.0);
        assert_eq!(classify(&pairings, &high_fiber, &config).unwrap().value(), 4);

        let low_fiber = summary(2250.0, 6.0, 78.0, 72.0);
        assert_eq!(classify(&pairings, &low_fiber, &config).unwrap().value(), 2);
    }

    #[test]
    fn test_tie_prefers_more_support() {
        // Identical centroids for types 3 and 5; type 5 has more backing
        let pairings = vec![
            pairing(1000.0, 10.0, 30.0, 60.0, 3),
            pairing(1000.0, 10.0, 30.0, 60.0, 5),
            pairing(1000.0, 10.0, 30.0, 60.0, 5),
        ];

        let result = classify(&pairings, &summary(1000.0, 10.0, 30.0, 60.0), &relaxed_config());
        assert_eq!(result.unwrap().value(), 5);
    }

    #[test]
    fn test_tie_with_equal_support_prefers_smaller_type() {
        let pairings = vec![
            pairing(1000.0, 10.0, 30.0, 60.0, 6),
            pairing(1000.0, 10.0, 30.0, 60.0, 3),
        ];

        let result = classify(&pairings, &summary(1000.0, 10.0, 30.0, 60.0), &relaxed_config());
        assert_eq!(result.unwrap().value(), 3);
    }

    #[test]
    fn test_flat_dimension_does_not_panic() {
        // Zero variance everywhere; the floor keeps distances finite
        let pairings = vec![
            pairing(1000.0, 10.0, 30.0, 60.0, 4),
            pairing(1000.0, 10.0, 30.0, 60.0, 4),
        ];

        let result = classify(&pairings, &summary(5000.0, 0.0, 0.0, 0.0), &relaxed_config());
        assert_eq!(result.unwrap().value(), 4);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let mut pairings = Vec::new();
        for i in 0..25 {
            pairings.push(pairing(
                1500.0 + (i % 7) as f64 * 40.0,
                10.0 + (i % 3) as f64,
                40.0,
                80.0,
                1 + (i % 7) as u8,
            ));
        }
        let current = summary(1600.0, 11.0, 40.0, 80.0);
        let config = PredictorConfig::default();

        let first = classify(&pairings, &current, &config).unwrap();
        let second = classify(&pairings, &current, &config).unwrap();
        assert_eq!(first, second);
    }
}
