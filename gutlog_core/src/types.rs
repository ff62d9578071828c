//! Core domain types for the Gutlog system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Bristol stool classification
//! - Food and stool events (stored) and their entry forms (submitted)
//! - Nutrient vectors and windowed summaries
//! - Analytics and prediction results

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Bristol Classification
// ============================================================================

/// A validated Bristol Stool Scale classification (1..=7).
///
/// Construction is checked: any value outside the scale is rejected, never
/// clamped. Serialized as a bare integer with the same check on the way in.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub struct BristolType(u8);

impl BristolType {
    /// Create a classification, rejecting values outside 1..=7
    pub fn new(value: u8) -> Result<Self> {
        if (1..=7).contains(&value) {
            Ok(BristolType(value))
        } else {
            Err(Error::Validation(format!(
                "bristol type must be 1-7, got {}",
                value
            )))
        }
    }

    /// The raw scale value (guaranteed 1..=7)
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for BristolType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        BristolType::new(value)
    }
}

impl From<BristolType> for u8 {
    fn from(t: BristolType) -> u8 {
        t.0
    }
}

impl fmt::Display for BristolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Quantity Units
// ============================================================================

/// Unit a food quantity was logged in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuantityUnit {
    Cup,
    Gram,
    Serving,
    Slice,
}

impl QuantityUnit {
    /// Lowercase name matching the serialized form
    pub fn as_str(self) -> &'static str {
        match self {
            QuantityUnit::Cup => "cup",
            QuantityUnit::Gram => "gram",
            QuantityUnit::Serving => "serving",
            QuantityUnit::Slice => "slice",
        }
    }
}

impl FromStr for QuantityUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cup" | "cups" => Ok(QuantityUnit::Cup),
            "gram" | "grams" | "g" => Ok(QuantityUnit::Gram),
            "serving" | "servings" => Ok(QuantityUnit::Serving),
            "slice" | "slices" => Ok(QuantityUnit::Slice),
            other => Err(Error::Validation(format!(
                "unknown quantity unit: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for QuantityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Nutrient Types
// ============================================================================

/// Nutrient content of a food, as returned by the lookup adapter
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NutrientVector {
    pub calories: f64,
    pub fiber: f64,
    pub fat: f64,
    pub protein: f64,
}

impl NutrientVector {
    /// Scale every field linearly (e.g. by a logged quantity)
    pub fn scale(&self, factor: f64) -> NutrientVector {
        NutrientVector {
            calories: self.calories * factor,
            fiber: self.fiber * factor,
            fat: self.fat * factor,
            protein: self.protein * factor,
        }
    }
}

// ============================================================================
// Events (stored) and Entries (submitted)
// ============================================================================

/// A food log entry as submitted by the presentation layer.
///
/// The nutrient vector is fixed before insertion (by the lookup adapter)
/// and never re-derived afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FoodEntry {
    pub user_id: i64,
    pub food_name: String,
    pub quantity: f64,
    pub unit: QuantityUnit,
    pub nutrients: NutrientVector,
    pub eaten_at: DateTime<Utc>,
}

/// A persisted food event. Immutable once stored; corrections are new events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FoodEvent {
    pub id: u64,
    pub user_id: i64,
    pub food_name: String,
    pub quantity: f64,
    pub unit: QuantityUnit,
    pub nutrients: NutrientVector,
    pub eaten_at: DateTime<Utc>,
}

/// A stool log entry as submitted by the presentation layer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoolEntry {
    pub user_id: i64,
    pub bristol: BristolType,
    pub bleeding: bool,
    pub urgency: u8,
    pub notes: Option<String>,
    pub logged_at: DateTime<Utc>,
}

/// A persisted stool event. Immutable once stored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoolEvent {
    pub id: u64,
    pub user_id: i64,
    pub bristol: BristolType,
    pub bleeding: bool,
    pub urgency: u8,
    pub notes: Option<String>,
    pub logged_at: DateTime<Utc>,
}

// ============================================================================
// Derived Results
// ============================================================================

/// Nutrient totals over a window of food events. Recomputed per request,
/// never persisted.
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq)]
pub struct NutrientSummary {
    pub calories: f64,
    pub fiber: f64,
    pub fat: f64,
    pub protein: f64,
    pub meal_count: u32,
}

/// Stool count for one calendar day
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u32,
}

/// Windowed stool analytics.
///
/// `average_bristol_score` is absent (not zero) when the window holds no
/// events; callers must distinguish "no data" from a score.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AnalyticsResult {
    pub frequency_data: Vec<DailyCount>,
    pub average_bristol_score: Option<f64>,
    pub total_logs: u32,
}

/// A predicted next stool classification with display context
#[derive(Clone, Debug, Serialize)]
pub struct PredictionResult {
    pub bristol: BristolType,
    pub description: &'static str,
    pub food_summary: NutrientSummary,
}
