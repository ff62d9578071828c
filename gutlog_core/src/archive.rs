//! CSV archive for rolled-up event WALs.
//!
//! This module implements atomic WAL-to-CSV conversion with proper error
//! handling to prevent data loss, plus the CSV reads the store's queries
//! merge in.

use crate::types::{BristolType, FoodEvent, NutrientVector, QuantityUnit, StoolEvent};
use crate::Result;
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::path::Path;

/// A food event row in the CSV archive
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CsvFoodRow {
    id: u64,
    user_id: i64,
    food_name: String,
    quantity: f64,
    unit: String,
    calories: f64,
    fiber: f64,
    fat: f64,
    protein: f64,
    eaten_at: String,
}

impl From<&FoodEvent> for CsvFoodRow {
    fn from(event: &FoodEvent) -> Self {
        CsvFoodRow {
            id: event.id,
            user_id: event.user_id,
            food_name: event.food_name.clone(),
            quantity: event.quantity,
            unit: event.unit.as_str().to_string(),
            calories: event.nutrients.calories,
            fiber: event.nutrients.fiber,
            fat: event.nutrients.fat,
            protein: event.nutrients.protein,
            eaten_at: event.eaten_at.to_rfc3339(),
        }
    }
}

impl TryFrom<CsvFoodRow> for FoodEvent {
    type Error = crate::Error;

    fn try_from(row: CsvFoodRow) -> Result<Self> {
        let eaten_at = parse_timestamp(&row.eaten_at)?;
        let unit: QuantityUnit = row.unit.parse()?;

        Ok(FoodEvent {
            id: row.id,
            user_id: row.user_id,
            food_name: row.food_name,
            quantity: row.quantity,
            unit,
            nutrients: NutrientVector {
                calories: row.calories,
                fiber: row.fiber,
                fat: row.fat,
                protein: row.protein,
            },
            eaten_at,
        })
    }
}

/// A stool event row in the CSV archive
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CsvStoolRow {
    id: u64,
    user_id: i64,
    bristol: u8,
    bleeding: bool,
    urgency: u8,
    notes: Option<String>,
    logged_at: String,
}

impl From<&StoolEvent> for CsvStoolRow {
    fn from(event: &StoolEvent) -> Self {
        CsvStoolRow {
            id: event.id,
            user_id: event.user_id,
            bristol: event.bristol.value(),
            bleeding: event.bleeding,
            urgency: event.urgency,
            notes: event.notes.clone(),
            logged_at: event.logged_at.to_rfc3339(),
        }
    }
}

impl TryFrom<CsvStoolRow> for StoolEvent {
    type Error = crate::Error;

    fn try_from(row: CsvStoolRow) -> Result<Self> {
        let logged_at = parse_timestamp(&row.logged_at)?;

        Ok(StoolEvent {
            id: row.id,
            user_id: row.user_id,
            bristol: BristolType::new(row.bristol)?,
            bleeding: row.bleeding,
            urgency: row.urgency,
            notes: row.notes.filter(|n| !n.is_empty()),
            logged_at,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::Error::Store(format!("Invalid timestamp in archive: {}", e)))
}

/// Load all food events from a CSV archive
pub(crate) fn read_food_events(path: &Path) -> Result<Vec<FoodEvent>> {
    read_rows::<CsvFoodRow, FoodEvent>(path)
}

/// Load all stool events from a CSV archive
pub(crate) fn read_stool_events(path: &Path) -> Result<Vec<StoolEvent>> {
    read_rows::<CsvStoolRow, StoolEvent>(path)
}

fn read_rows<R, T>(path: &Path) -> Result<Vec<T>>
where
    R: serde::de::DeserializeOwned,
    T: TryFrom<R, Error = crate::Error>,
{
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut events = Vec::new();
    for result in reader.deserialize::<R>() {
        match result {
            Ok(row) => match T::try_from(row) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("Failed to parse CSV row: {}", e);
                    // Continue processing other rows
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
            }
        }
    }

    Ok(events)
}

/// Roll up a food WAL into the CSV archive and rename the WAL aside
pub fn rollup_foods(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let events: Vec<FoodEvent> = crate::store::read_events(wal_path)?;
    rollup(wal_path, csv_path, &events, |e| CsvFoodRow::from(e))
}

/// Roll up a stool WAL into the CSV archive and rename the WAL aside
pub fn rollup_stools(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let events: Vec<StoolEvent> = crate::store::read_events(wal_path)?;
    rollup(wal_path, csv_path, &events, |e| CsvStoolRow::from(e))
}

/// Append events to a CSV archive and archive the WAL atomically
///
/// This function:
/// 1. Appends the events to the CSV file (creates with headers if needed)
/// 2. Syncs the CSV to disk
/// 3. Renames the WAL to .processed
/// 4. Returns the number of events processed
///
/// # Safety
/// - CSV is fsynced before the WAL is renamed
/// - The WAL is renamed (not deleted) to allow manual recovery if needed
/// - Processed WAL files can be cleaned up with [`cleanup_processed_wals`]
fn rollup<T, R, F>(wal_path: &Path, csv_path: &Path, events: &[T], to_row: F) -> Result<usize>
where
    R: serde::Serialize,
    F: Fn(&T) -> R,
{
    if events.is_empty() {
        tracing::info!("No events in {:?} to roll up", wal_path);
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(csv_path)?;

    // Write headers only when the file is fresh
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for event in events {
        writer.serialize(to_row(event))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Wrote {} events to {:?}", events.len(), csv_path);

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(events.len())
}

/// Clean up old processed WAL files
///
/// This removes all .wal.processed files in the given directory.
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(extension) = path.extension() {
            if extension == "processed" {
                std::fs::remove_file(&path)?;
                tracing::debug!("Removed processed WAL: {:?}", path);
                count += 1;
            }
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}
