//! Append-only event store.
//!
//! Events append to JSONL (JSON Lines) WAL files with file locking to
//! ensure safe concurrent access. Long-term storage is a CSV archive
//! produced by the rollup in [`crate::archive`]; queries merge both tiers
//! and deduplicate by event id.

use crate::types::{FoodEntry, FoodEvent, StoolEntry, StoolEvent};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// The record-insert/record-query contract the engine consumes.
///
/// Implementations assign monotonically increasing ids at insert, so the
/// per-user total order is (timestamp, id). There is no update or delete:
/// corrections are modeled as new events.
pub trait EventStore {
    fn insert_food(&self, entry: FoodEntry) -> Result<FoodEvent>;
    fn insert_stool(&self, entry: StoolEntry) -> Result<StoolEvent>;

    /// Food events for one user in `[from, to]`, ascending by (eaten_at, id)
    fn query_foods(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<FoodEvent>>;

    /// Stool events for one user in `[from, to]`, ascending by (logged_at, id)
    fn query_stools(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoolEvent>>;
}

/// Accessors shared by both persisted event kinds
pub(crate) trait StoredEvent {
    fn id(&self) -> u64;
    fn user(&self) -> i64;
    fn timestamp(&self) -> DateTime<Utc>;
}

impl StoredEvent for FoodEvent {
    fn id(&self) -> u64 {
        self.id
    }
    fn user(&self) -> i64 {
        self.user_id
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.eaten_at
    }
}

impl StoredEvent for StoolEvent {
    fn id(&self) -> u64 {
        self.id
    }
    fn user(&self) -> i64 {
        self.user_id
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.logged_at
    }
}

/// JSONL-backed event store rooted at a data directory.
///
/// Layout: `<dir>/wal/foods.wal`, `<dir>/wal/stools.wal` (recent, JSONL)
/// and `<dir>/foods.csv`, `<dir>/stools.csv` (archived).
pub struct JsonlEventStore {
    dir: PathBuf,
}

impl JsonlEventStore {
    /// Create a store for the given data directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn foods_wal_path(&self) -> PathBuf {
        self.dir.join("wal").join("foods.wal")
    }

    pub fn stools_wal_path(&self) -> PathBuf {
        self.dir.join("wal").join("stools.wal")
    }

    pub fn foods_csv_path(&self) -> PathBuf {
        self.dir.join("foods.csv")
    }

    pub fn stools_csv_path(&self) -> PathBuf {
        self.dir.join("stools.csv")
    }

    pub fn wal_dir(&self) -> PathBuf {
        self.dir.join("wal")
    }

    /// Append an event to a WAL, assigning the next id under an exclusive
    /// lock. `archived_max` is the highest id already rolled up to CSV.
    fn append_with_id<T, F>(&self, wal_path: &Path, archived_max: u64, build: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + StoredEvent,
        F: FnOnce(u64) -> T,
    {
        if let Some(parent) = wal_path.parent() {
            std::fs::create_dir_all(parent).map_err(unavailable)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(wal_path)
            .map_err(unavailable)?;

        file.lock_exclusive().map_err(unavailable)?;

        // Scan the WAL for the current max id. The handle is in append
        // mode, so writes below land at EOF regardless of read position.
        (&file).seek(SeekFrom::Start(0)).map_err(unavailable)?;
        let mut max_id = archived_max;
        {
            let reader = BufReader::new(&file);
            for line_result in reader.lines() {
                let line = line_result.map_err(unavailable)?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<T>(&line) {
                    Ok(event) => max_id = max_id.max(event.id()),
                    Err(e) => {
                        tracing::warn!("Skipping malformed WAL line: {}", e);
                    }
                }
            }
        }

        let event = build(max_id + 1);
        let line = serde_json::to_string(&event)?;

        let mut writer = std::io::BufWriter::new(&file);
        writer.write_all(line.as_bytes()).map_err(unavailable)?;
        writer.write_all(b"\n").map_err(unavailable)?;
        writer.flush().map_err(unavailable)?;
        drop(writer);

        file.unlock().map_err(unavailable)?;

        tracing::debug!("Appended event {} to {:?}", event.id(), wal_path);
        Ok(event)
    }
}

impl EventStore for JsonlEventStore {
    fn insert_food(&self, entry: FoodEntry) -> Result<FoodEvent> {
        validate_food(&entry)?;

        let archived = crate::archive::read_food_events(&self.foods_csv_path())?;
        let archived_max = archived.iter().map(|e| e.id).max().unwrap_or(0);

        self.append_with_id(&self.foods_wal_path(), archived_max, |id| FoodEvent {
            id,
            user_id: entry.user_id,
            food_name: entry.food_name.clone(),
            quantity: entry.quantity,
            unit: entry.unit,
            nutrients: entry.nutrients,
            eaten_at: entry.eaten_at,
        })
    }

    fn insert_stool(&self, entry: StoolEntry) -> Result<StoolEvent> {
        validate_stool(&entry)?;

        let archived = crate::archive::read_stool_events(&self.stools_csv_path())?;
        let archived_max = archived.iter().map(|e| e.id).max().unwrap_or(0);

        self.append_with_id(&self.stools_wal_path(), archived_max, |id| StoolEvent {
            id,
            user_id: entry.user_id,
            bristol: entry.bristol,
            bleeding: entry.bleeding,
            urgency: entry.urgency,
            notes: entry.notes.clone(),
            logged_at: entry.logged_at,
        })
    }

    fn query_foods(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<FoodEvent>> {
        let wal = read_events(&self.foods_wal_path())?;
        let archived = crate::archive::read_food_events(&self.foods_csv_path())?;
        Ok(merge_window(wal, archived, user_id, from, to))
    }

    fn query_stools(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoolEvent>> {
        let wal = read_events(&self.stools_wal_path())?;
        let archived = crate::archive::read_stool_events(&self.stools_csv_path())?;
        Ok(merge_window(wal, archived, user_id, from, to))
    }
}

/// Check a food entry before it reaches the WAL
fn validate_food(entry: &FoodEntry) -> Result<()> {
    if !entry.quantity.is_finite() || entry.quantity <= 0.0 {
        return Err(Error::Validation(format!(
            "quantity must be positive, got {}",
            entry.quantity
        )));
    }
    if entry.food_name.trim().is_empty() {
        return Err(Error::Validation("food name must not be empty".into()));
    }
    Ok(())
}

/// Check a stool entry before it reaches the WAL.
///
/// Bristol validity is already guaranteed by `BristolType` construction.
fn validate_stool(entry: &StoolEntry) -> Result<()> {
    if !(1..=5).contains(&entry.urgency) {
        return Err(Error::Validation(format!(
            "urgency must be 1-5, got {}",
            entry.urgency
        )));
    }
    Ok(())
}

/// Read all events from a WAL file
///
/// Malformed lines are logged and skipped, never fatal for reads.
pub(crate) fn read_events<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path).map_err(unavailable)?;
    file.lock_shared().map_err(unavailable)?;

    let reader = BufReader::new(&file);
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(unavailable)?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("Failed to parse event at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock().map_err(unavailable)?;
    tracing::debug!("Read {} events from {:?}", events.len(), path);
    Ok(events)
}

/// Merge WAL and archived events, dedup by id, filter to one user's
/// `[from, to]`, and sort ascending by (timestamp, id)
fn merge_window<T: StoredEvent>(
    wal: Vec<T>,
    archived: Vec<T>,
    user_id: i64,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<T> {
    let mut seen_ids = HashSet::new();
    let mut events: Vec<T> = Vec::new();

    for event in wal.into_iter().chain(archived) {
        if !seen_ids.insert(event.id()) {
            continue;
        }
        if event.user() != user_id {
            continue;
        }
        let at = event.timestamp();
        if at >= from && at <= to {
            events.push(event);
        }
    }

    events.sort_by_key(|e| (e.timestamp(), e.id()));
    events
}

fn unavailable(e: std::io::Error) -> Error {
    Error::Store(e.to_string())
}
