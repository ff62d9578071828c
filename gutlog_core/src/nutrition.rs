//! Nutrient lookup adapter.
//!
//! The engine consumes the [`NutrientLookup`] contract: food name plus
//! quantity and unit in, nutrient vector out, hard failure for unknown
//! foods. A lookup failure aborts the food log write; nutrients are never
//! silently zero-filled, since that would poison the predictor's training
//! data.

use crate::config::CustomFood;
use crate::types::{NutrientVector, QuantityUnit};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// The nutrient lookup contract
pub trait NutrientLookup {
    /// Nutrients for `quantity` of a food in the given unit.
    ///
    /// Fails with [`Error::Lookup`] when the food is unrecognized or has
    /// no entry for the unit.
    fn lookup(&self, food_name: &str, quantity: f64, unit: QuantityUnit) -> Result<NutrientVector>;
}

/// Nutrients per one unit, keyed by the units a food supports
#[derive(Clone, Debug)]
pub struct FoodSpec {
    per_unit: HashMap<QuantityUnit, NutrientVector>,
}

/// Cached built-in food table - built once and reused across all operations
static BUILTIN: Lazy<HashMap<String, FoodSpec>> = Lazy::new(build_builtin_table);

fn nv(calories: f64, fiber: f64, fat: f64, protein: f64) -> NutrientVector {
    NutrientVector {
        calories,
        fiber,
        fat,
        protein,
    }
}

fn spec(units: &[(QuantityUnit, NutrientVector)]) -> FoodSpec {
    FoodSpec {
        per_unit: units.iter().copied().collect(),
    }
}

/// Builds the built-in table of common foods.
///
/// Values are per one unit (one cup, one gram, one serving, one slice).
fn build_builtin_table() -> HashMap<String, FoodSpec> {
    use QuantityUnit::*;

    let mut foods = HashMap::new();

    foods.insert(
        "oatmeal".into(),
        spec(&[
            (Cup, nv(154.0, 4.0, 2.6, 5.4)),
            (Serving, nv(154.0, 4.0, 2.6, 5.4)),
            (Gram, nv(0.66, 0.017, 0.011, 0.023)),
        ]),
    );

    foods.insert(
        "banana".into(),
        spec(&[
            (Serving, nv(105.0, 3.1, 0.4, 1.3)),
            (Gram, nv(0.89, 0.026, 0.003, 0.011)),
        ]),
    );

    foods.insert(
        "apple".into(),
        spec(&[
            (Serving, nv(95.0, 4.4, 0.3, 0.5)),
            (Gram, nv(0.52, 0.024, 0.002, 0.003)),
        ]),
    );

    foods.insert(
        "chicken breast".into(),
        spec(&[
            (Serving, nv(165.0, 0.0, 3.6, 31.0)),
            (Gram, nv(1.65, 0.0, 0.036, 0.31)),
        ]),
    );

    foods.insert(
        "white rice".into(),
        spec(&[
            (Cup, nv(205.0, 0.6, 0.4, 4.3)),
            (Gram, nv(1.3, 0.004, 0.003, 0.027)),
        ]),
    );

    foods.insert(
        "brown rice".into(),
        spec(&[
            (Cup, nv(216.0, 3.5, 1.8, 5.0)),
            (Gram, nv(1.11, 0.018, 0.009, 0.026)),
        ]),
    );

    foods.insert(
        "lentils".into(),
        spec(&[
            (Cup, nv(230.0, 15.6, 0.8, 17.9)),
            (Gram, nv(1.16, 0.079, 0.004, 0.09)),
        ]),
    );

    foods.insert(
        "greek yogurt".into(),
        spec(&[
            (Serving, nv(100.0, 0.0, 0.7, 17.3)),
            (Cup, nv(146.0, 0.0, 1.0, 25.0)),
        ]),
    );

    foods.insert(
        "egg".into(),
        spec(&[(Serving, nv(78.0, 0.0, 5.3, 6.3))]),
    );

    foods.insert(
        "whole wheat bread".into(),
        spec(&[(Slice, nv(81.0, 1.9, 1.1, 3.9))]),
    );

    foods.insert(
        "cheese pizza".into(),
        spec(&[(Slice, nv(285.0, 1.6, 10.4, 12.2))]),
    );

    foods.insert(
        "almonds".into(),
        spec(&[
            (Serving, nv(164.0, 3.5, 14.2, 6.0)),
            (Gram, nv(5.79, 0.125, 0.499, 0.212)),
        ]),
    );

    foods.insert(
        "broccoli".into(),
        spec(&[
            (Cup, nv(55.0, 5.1, 0.6, 3.7)),
            (Gram, nv(0.35, 0.033, 0.004, 0.024)),
        ]),
    );

    foods
}

/// Static food table, optionally extended with custom entries from config.
///
/// Stands in for an external nutrition database; name matching is
/// case-insensitive and lookup scales linearly by quantity.
#[derive(Clone, Debug)]
pub struct FoodTable {
    entries: HashMap<String, FoodSpec>,
}

impl FoodTable {
    /// Table with only the built-in foods
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN.clone(),
        }
    }

    /// Built-in foods plus custom entries; on a (name, unit) clash the
    /// custom value wins
    pub fn with_custom(custom: &[CustomFood]) -> Self {
        let mut entries = BUILTIN.clone();

        for food in custom {
            let nutrients = nv(food.calories, food.fiber, food.fat, food.protein);
            entries
                .entry(normalize(&food.name))
                .or_insert_with(|| FoodSpec {
                    per_unit: HashMap::new(),
                })
                .per_unit
                .insert(food.unit, nutrients);
        }

        if !custom.is_empty() {
            tracing::info!("Merged {} custom food entries", custom.len());
        }

        Self { entries }
    }
}

impl NutrientLookup for FoodTable {
    fn lookup(&self, food_name: &str, quantity: f64, unit: QuantityUnit) -> Result<NutrientVector> {
        let key = normalize(food_name);

        let spec = self.entries.get(&key).ok_or_else(|| {
            Error::Lookup(format!(
                "no nutrition data for '{}' (try a more specific name)",
                food_name
            ))
        })?;

        let base = spec.per_unit.get(&unit).ok_or_else(|| {
            Error::Lookup(format!("'{}' has no per-{} nutrition entry", food_name, unit))
        })?;

        Ok(base.scale(quantity))
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
