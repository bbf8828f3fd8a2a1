//! Core domain types for the Platewise tracker.
//!
//! This module defines the records that are persisted and the read model
//! handed to presentation layers:
//! - Food items and the daily entries that group them
//! - Weight history
//! - User settings
//! - Derived progress statistics and daily summaries

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

// ============================================================================
// Food Types
// ============================================================================

/// A single logged food item.
///
/// Nutrient values are unsigned, so a stored item can never carry negative
/// calories or macros.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub id: Uuid,
    pub name: String,
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
    #[serde(default)]
    pub dietary_tags: BTreeSet<String>,
    pub date_added: DateTime<Local>,
}

impl FoodItem {
    /// Create a new item with a fresh id, stamped with the current time
    pub fn new(name: impl Into<String>, calories: u32, protein: u32, carbs: u32, fat: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            calories,
            protein,
            carbs,
            fat,
            dietary_tags: BTreeSet::new(),
            date_added: Local::now(),
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.dietary_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Restamp the creation time, e.g. with the store's clock
    pub fn added_at(mut self, at: DateTime<Local>) -> Self {
        self.date_added = at;
        self
    }

    /// Copy this item under a new identity, as when a catalog item is logged again
    pub fn relogged(&self, at: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date_added: at,
            ..self.clone()
        }
    }
}

/// The food items logged for one calendar day.
///
/// `date` is always local midnight of the day it represents.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyEntry {
    pub id: Uuid,
    pub date: DateTime<Local>,
    pub food_items: Vec<FoodItem>,
}

impl DailyEntry {
    pub fn new(date: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            food_items: Vec::new(),
        }
    }

    /// Calendar day this entry belongs to
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }

    pub fn total_calories(&self) -> u32 {
        self.sum_by(|item| item.calories)
    }

    pub fn total_protein(&self) -> u32 {
        self.sum_by(|item| item.protein)
    }

    pub fn total_carbs(&self) -> u32 {
        self.sum_by(|item| item.carbs)
    }

    pub fn total_fat(&self) -> u32 {
        self.sum_by(|item| item.fat)
    }

    fn sum_by(&self, field: impl Fn(&FoodItem) -> u32) -> u32 {
        self.food_items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(field(item)))
    }
}

// ============================================================================
// Weight Types
// ============================================================================

/// A body-weight measurement
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightEntry {
    pub id: Uuid,
    pub date: DateTime<Local>,
    /// Always kilograms; convert with `UnitSystem` for display
    pub weight: f64,
}

impl WeightEntry {
    pub fn new(date: DateTime<Local>, weight: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            weight,
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Measurement system preferred by the user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl std::str::FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            other => Err(format!("unknown unit system: {}", other)),
        }
    }
}

const POUNDS_PER_KILOGRAM: f64 = 2.20462;

impl UnitSystem {
    /// Convert a stored kilogram value into this unit system
    pub fn weight_from_kg(self, kg: f64) -> f64 {
        match self {
            UnitSystem::Metric => kg,
            UnitSystem::Imperial => kg * POUNDS_PER_KILOGRAM,
        }
    }

    /// Convert a weight entered in this unit system to kilograms
    pub fn weight_to_kg(self, value: f64) -> f64 {
        match self {
            UnitSystem::Metric => value,
            UnitSystem::Imperial => value / POUNDS_PER_KILOGRAM,
        }
    }

    pub fn weight_label(self) -> &'static str {
        match self {
            UnitSystem::Metric => "kg",
            UnitSystem::Imperial => "lb",
        }
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitSystem::Metric => write!(f, "metric"),
            UnitSystem::Imperial => write!(f, "imperial"),
        }
    }
}

/// User settings, persisted as a single blob
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_daily_calorie_goal")]
    pub daily_calorie_goal: u32,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub preferred_units: UnitSystem,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daily_calorie_goal: default_daily_calorie_goal(),
            language: default_language(),
            preferred_units: UnitSystem::default(),
        }
    }
}

pub(crate) fn default_daily_calorie_goal() -> u32 {
    2000
}

pub(crate) fn default_language() -> String {
    "English".into()
}

// ============================================================================
// Derived Read Model
// ============================================================================

/// Rolling statistics recomputed after every data mutation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub weekly_average_calories: f64,
    pub monthly_average_calories: f64,
    pub weekly_weight_change: f64,
    pub monthly_weight_change: f64,
    pub streak_days: u32,
}

/// Intake for one day measured against the calorie goal
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub item_count: usize,
    pub total_calories: u32,
    pub total_protein: u32,
    pub total_carbs: u32,
    pub total_fat: u32,
    pub calorie_goal: u32,
    /// Goal minus intake; negative once the goal is exceeded
    pub remaining_calories: i64,
    /// Fraction of the goal consumed, clamped to `0.0..=1.0`
    pub progress: f64,
}

impl DailySummary {
    pub fn new(date: NaiveDate, entry: Option<&DailyEntry>, calorie_goal: u32) -> Self {
        let (item_count, calories, protein, carbs, fat) = match entry {
            Some(e) => (
                e.food_items.len(),
                e.total_calories(),
                e.total_protein(),
                e.total_carbs(),
                e.total_fat(),
            ),
            None => (0, 0, 0, 0, 0),
        };

        let progress = if calorie_goal == 0 {
            0.0
        } else {
            (f64::from(calories) / f64::from(calorie_goal)).clamp(0.0, 1.0)
        };

        Self {
            date,
            item_count,
            total_calories: calories,
            total_protein: protein,
            total_carbs: carbs,
            total_fat: fat,
            calorie_goal,
            remaining_calories: i64::from(calorie_goal) - i64::from(calories),
            progress,
        }
    }
}
