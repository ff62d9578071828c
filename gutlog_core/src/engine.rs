//! Engine facade orchestrating the store, lookup, aggregator and predictor.
//!
//! Holds no state of its own beyond its collaborators; every operation is
//! a request-scoped computation over an immutable store snapshot. "Now"
//! is an explicit argument so identical snapshots produce identical
//! results.

use crate::aggregate;
use crate::bristol;
use crate::config::Config;
use crate::nutrition::NutrientLookup;
use crate::predict;
use crate::store::EventStore;
use crate::types::{
    AnalyticsResult, FoodEntry, FoodEvent, PredictionResult, QuantityUnit, StoolEntry, StoolEvent,
};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};

/// The two-operation surface the presentation layer talks to, plus the
/// event-logging entry points that feed it
pub struct Engine<S, L> {
    store: S,
    lookup: L,
    config: Config,
}

impl<S: EventStore, L: NutrientLookup> Engine<S, L> {
    pub fn new(store: S, lookup: L, config: Config) -> Self {
        Self {
            store,
            lookup,
            config,
        }
    }

    /// Log a meal: resolve nutrients, then persist.
    ///
    /// A lookup failure aborts the whole write; nothing is partially
    /// committed and nutrients are never defaulted to zero.
    pub fn log_food(
        &self,
        user_id: i64,
        food_name: &str,
        quantity: f64,
        unit: QuantityUnit,
        eaten_at: DateTime<Utc>,
    ) -> Result<FoodEvent> {
        let nutrients = self.lookup.lookup(food_name, quantity, unit)?;

        let event = self.store.insert_food(FoodEntry {
            user_id,
            food_name: food_name.to_string(),
            quantity,
            unit,
            nutrients,
            eaten_at,
        })?;

        tracing::info!(
            "Logged food event {} for user {}: {} ({} {})",
            event.id,
            user_id,
            event.food_name,
            event.quantity,
            event.unit
        );
        Ok(event)
    }

    /// Log a stool observation
    pub fn log_stool(&self, entry: StoolEntry) -> Result<StoolEvent> {
        let event = self.store.insert_stool(entry)?;
        tracing::info!(
            "Logged stool event {} for user {}: type {}",
            event.id,
            event.user_id,
            event.bristol
        );
        Ok(event)
    }

    /// Rolling stool analytics over a trailing window anchored at `now`
    /// (default length from config). Never fails on empty data: the
    /// result degrades to zero counts and an absent average.
    pub fn compute_analytics(
        &self,
        user_id: i64,
        window_days: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsResult> {
        let days = window_days.unwrap_or(self.config.analytics.window_days);
        if days < 1 {
            return Err(Error::Validation(format!(
                "window must be at least 1 day, got {}",
                days
            )));
        }

        let from = now - Duration::days(days);
        let stools = self.store.query_stools(user_id, from, now)?;

        Ok(aggregate::summarize_stools(
            &stools,
            from.date_naive(),
            now.date_naive(),
        ))
    }

    /// Predict the next bristol type from recent nutrient intake.
    ///
    /// Strict where analytics is tolerant: too little history is an
    /// error, never an approximated guess.
    pub fn predict_next(&self, user_id: i64, now: DateTime<Utc>) -> Result<PredictionResult> {
        let foods = self.store.query_foods(user_id, DateTime::<Utc>::MIN_UTC, now)?;
        let stools = self.store.query_stools(user_id, DateTime::<Utc>::MIN_UTC, now)?;

        if foods.is_empty() && !stools.is_empty() {
            return Err(Error::NoFoodData);
        }

        let fallback = Duration::hours(self.config.predictor.fallback_lookback_hours);
        let pairings = predict::build_pairings(&foods, &stools, fallback);

        let current = predict::current_window_summary(&foods, &stools, now, fallback);
        let bristol = predict::classify(&pairings, &current, &self.config.predictor)?;

        if current.meal_count == 0 {
            // Nothing eaten since the last observation; features would be
            // fabricated zeros rather than intake
            return Err(Error::NoFoodData);
        }

        tracing::info!(
            "Predicted type {} for user {} from {} pairings",
            bristol,
            user_id,
            pairings.len()
        );

        Ok(PredictionResult {
            bristol,
            description: bristol::scale_entry(bristol).description,
            food_summary: current,
        })
    }
}
