//! CSV export of the daily log and weight history.
//!
//! Each export rewrites its target file in full and fsyncs it before
//! returning the number of rows written.

use crate::{DailyEntry, Result, WeightEntry};
use std::fs::File;
use std::path::Path;

/// A row in the daily log export
#[derive(Debug, serde::Serialize)]
struct DailyRow {
    date: String,
    items: usize,
    calories: u32,
    protein: u32,
    carbs: u32,
    fat: u32,
}

impl From<&DailyEntry> for DailyRow {
    fn from(entry: &DailyEntry) -> Self {
        DailyRow {
            date: entry.day().to_string(),
            items: entry.food_items.len(),
            calories: entry.total_calories(),
            protein: entry.total_protein(),
            carbs: entry.total_carbs(),
            fat: entry.total_fat(),
        }
    }
}

/// A row in the weight export
#[derive(Debug, serde::Serialize)]
struct WeightRow {
    recorded_at: String,
    weight: f64,
}

impl From<&WeightEntry> for WeightRow {
    fn from(entry: &WeightEntry) -> Self {
        WeightRow {
            recorded_at: entry.date.to_rfc3339(),
            weight: entry.weight,
        }
    }
}

/// Write one row per day, oldest day first
pub fn export_daily_csv(entries: &[DailyEntry], path: &Path) -> Result<usize> {
    let mut sorted: Vec<&DailyEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.date);
    write_rows(path, sorted.into_iter().map(DailyRow::from))
}

/// Write one row per weight measurement in stored order
pub fn export_weight_csv(entries: &[WeightEntry], path: &Path) -> Result<usize> {
    write_rows(path, entries.iter().map(WeightRow::from))
}

fn write_rows<T: serde::Serialize>(path: &Path, rows: impl Iterator<Item = T>) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} rows to {:?}", count, path);
    Ok(count)
}
