//! The tracker store: in-memory collections backed by keyed blobs.
//!
//! A `Store` owns the four persisted collections (daily entries, the
//! reusable food catalog, weight history, settings) plus the derived
//! `ProgressStats`. Every mutation follows the same sequence: apply in
//! memory, persist the touched blobs, recompute statistics. The store is
//! a plain owned value with a single writer; callers that work on other
//! threads hand results back to the owner (see `vision::spawn_analysis`).
//!
//! Input validation (positive weight, positive goal, non-empty names) is
//! the caller's job. The store accepts what it is given.

use crate::blob::{
    self, BlobStore, DAILY_ENTRIES_KEY, SAVED_FOOD_ITEMS_KEY, USER_SETTINGS_KEY,
    WEIGHT_ENTRIES_KEY,
};
use crate::clock::{local_midnight, Clock, SystemClock};
use crate::vision::Dish;
use crate::{stats, DailyEntry, DailySummary, FoodItem, ProgressStats, Result, Settings};
use crate::{UnitSystem, WeightEntry};
use chrono::{DateTime, Local, NaiveDate};
use uuid::Uuid;

pub struct Store<S: BlobStore> {
    blobs: S,
    clock: Box<dyn Clock>,
    daily_entries: Vec<DailyEntry>,
    saved_food_items: Vec<FoodItem>,
    weight_entries: Vec<WeightEntry>,
    settings: Settings,
    stats: ProgressStats,
}

impl<S: BlobStore> Store<S> {
    /// Load all collections from `blobs` using the system clock.
    ///
    /// `default_settings` applies only when no settings blob can be decoded.
    pub fn open(blobs: S, default_settings: Settings) -> Self {
        Self::with_clock(blobs, default_settings, Box::new(SystemClock))
    }

    pub fn with_clock(blobs: S, default_settings: Settings, clock: Box<dyn Clock>) -> Self {
        let daily_entries: Vec<DailyEntry> = blob::load_or_default(&blobs, DAILY_ENTRIES_KEY);
        let saved_food_items: Vec<FoodItem> =
            blob::load_or_default(&blobs, SAVED_FOOD_ITEMS_KEY);
        let mut weight_entries: Vec<WeightEntry> =
            blob::load_or_default(&blobs, WEIGHT_ENTRIES_KEY);
        weight_entries.sort_by(|a, b| a.date.cmp(&b.date));

        let settings = match blobs.load(USER_SETTINGS_KEY) {
            Some(contents) => match serde_json::from_str::<Settings>(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Failed to decode settings: {}. Using defaults.", e);
                    default_settings
                }
            },
            None => default_settings,
        };

        tracing::info!(
            "Opened store: {} days, {} catalog items, {} weights",
            daily_entries.len(),
            saved_food_items.len(),
            weight_entries.len()
        );

        let mut store = Self {
            blobs,
            clock,
            daily_entries,
            saved_food_items,
            weight_entries,
            settings,
            stats: ProgressStats::default(),
        };
        store.recompute_stats();
        store
    }

    // ------------------------------------------------------------------------
    // Read model
    // ------------------------------------------------------------------------

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn daily_entries(&self) -> &[DailyEntry] {
        &self.daily_entries
    }

    /// Reusable food items, one per distinct name
    pub fn catalog(&self) -> &[FoodItem] {
        &self.saved_food_items
    }

    /// Weight history, oldest first
    pub fn weight_entries(&self) -> &[WeightEntry] {
        &self.weight_entries
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &ProgressStats {
        &self.stats
    }

    pub fn blobs(&self) -> &S {
        &self.blobs
    }

    pub fn entry_for(&self, date: NaiveDate) -> Option<&DailyEntry> {
        self.daily_entries.iter().find(|e| e.day() == date)
    }

    pub fn find_in_catalog(&self, name: &str) -> Option<&FoodItem> {
        self.saved_food_items.iter().find(|item| item.name == name)
    }

    /// Intake for `date` against the current calorie goal
    pub fn summary_for(&self, date: NaiveDate) -> DailySummary {
        DailySummary::new(date, self.entry_for(date), self.settings.daily_calorie_goal)
    }

    // ------------------------------------------------------------------------
    // Daily entries
    // ------------------------------------------------------------------------

    /// Today's entry, created empty and persisted if it does not exist yet.
    ///
    /// Never fails: a persistence error is logged and the entry is still
    /// returned from memory.
    pub fn get_or_create_todays_entry(&mut self) -> DailyEntry {
        let today = self.today();
        if let Some(entry) = self.entry_for(today) {
            return entry.clone();
        }

        let entry = DailyEntry::new(local_midnight(today));
        self.daily_entries.push(entry.clone());
        if let Err(e) = self.persist_daily_entries() {
            tracing::warn!("Failed to persist new entry for {}: {}", today, e);
        }
        tracing::debug!("Created daily entry for {}", today);
        entry
    }

    pub fn add_food_item(&mut self, item: FoodItem) -> Result<()> {
        let today = self.today();
        self.add_food_item_on(item, today)
    }

    /// Append `item` to the entry for `date`, creating the entry if needed.
    ///
    /// The item also joins the catalog unless an item with the same name is
    /// already there.
    pub fn add_food_item_on(&mut self, item: FoodItem, date: NaiveDate) -> Result<()> {
        tracing::info!("Logging {} ({} kcal) on {}", item.name, item.calories, date);

        let catalog_saved = if self.find_in_catalog(&item.name).is_none() {
            self.saved_food_items.push(item.clone());
            self.persist_catalog()
        } else {
            Ok(())
        };

        self.entry_mut(date).food_items.push(item);
        let entries_saved = self.persist_daily_entries();

        self.recompute_stats();
        catalog_saved.and(entries_saved)
    }

    /// Log a fresh copy of the catalog item named `name`.
    ///
    /// Returns the logged item, or `None` when the catalog has no such name.
    pub fn add_from_catalog(&mut self, name: &str, date: NaiveDate) -> Result<Option<FoodItem>> {
        let Some(template) = self.find_in_catalog(name) else {
            return Ok(None);
        };
        let item = template.relogged(self.now());
        self.add_food_item_on(item.clone(), date)?;
        Ok(Some(item))
    }

    /// Log the given dishes from a menu analysis on `date` in one step.
    /// Items are stamped with the store's clock.
    pub fn log_dishes(&mut self, dishes: &[Dish], date: NaiveDate) -> Result<Vec<FoodItem>> {
        let now = self.now();
        let items: Vec<FoodItem> = dishes.iter().map(|d| FoodItem::from_dish(d, now)).collect();
        if items.is_empty() {
            return Ok(items);
        }

        let mut catalog_changed = false;
        for item in &items {
            if self.find_in_catalog(&item.name).is_none() {
                self.saved_food_items.push(item.clone());
                catalog_changed = true;
            }
        }
        self.entry_mut(date).food_items.extend(items.iter().cloned());

        let catalog_saved = if catalog_changed {
            self.persist_catalog()
        } else {
            Ok(())
        };
        let entries_saved = self.persist_daily_entries();

        tracing::info!("Logged {} dishes on {}", items.len(), date);
        self.recompute_stats();
        catalog_saved.and(entries_saved)?;
        Ok(items)
    }

    pub fn remove_food_item(&mut self, item_id: Uuid) -> Result<bool> {
        let today = self.today();
        self.remove_food_item_on(item_id, today)
    }

    /// Remove the item with `item_id` from the entry for `date`.
    ///
    /// Returns whether anything was removed; an unknown date or id is a no-op.
    pub fn remove_food_item_on(&mut self, item_id: Uuid, date: NaiveDate) -> Result<bool> {
        let Some(entry) = self.daily_entries.iter_mut().find(|e| e.day() == date) else {
            return Ok(false);
        };
        let Some(index) = entry.food_items.iter().position(|item| item.id == item_id) else {
            return Ok(false);
        };

        let removed = entry.food_items.remove(index);
        tracing::info!("Removed {} from {}", removed.name, date);

        let saved = self.persist_daily_entries();
        self.recompute_stats();
        saved.map(|_| true)
    }

    // ------------------------------------------------------------------------
    // Weight
    // ------------------------------------------------------------------------

    pub fn add_weight_entry(&mut self, weight: f64) -> Result<WeightEntry> {
        let now = self.now();
        self.add_weight_entry_at(weight, now)
    }

    /// Record a weight measurement. Callers must reject `weight <= 0` first.
    pub fn add_weight_entry_at(&mut self, weight: f64, at: DateTime<Local>) -> Result<WeightEntry> {
        let entry = WeightEntry::new(at, weight);
        self.weight_entries.push(entry.clone());
        self.weight_entries.sort_by(|a, b| a.date.cmp(&b.date));
        tracing::info!("Recorded weight {:.1} at {}", weight, at);

        let saved = blob::save_json(&mut self.blobs, WEIGHT_ENTRIES_KEY, &self.weight_entries);
        self.recompute_stats();
        saved.map(|_| entry)
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    /// Set the daily calorie goal. Callers must reject zero first.
    pub fn update_daily_calorie_goal(&mut self, goal: u32) -> Result<()> {
        self.settings.daily_calorie_goal = goal;
        tracing::info!("Daily calorie goal set to {}", goal);
        self.persist_settings()
    }

    pub fn update_language(&mut self, language: impl Into<String>) -> Result<()> {
        self.settings.language = language.into();
        tracing::info!("Language set to {}", self.settings.language);
        self.persist_settings()
    }

    pub fn update_preferred_units(&mut self, units: UnitSystem) -> Result<()> {
        self.settings.preferred_units = units;
        tracing::info!("Preferred units set to {}", units);
        self.persist_settings()
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn entry_mut(&mut self, date: NaiveDate) -> &mut DailyEntry {
        let index = match self.daily_entries.iter().position(|e| e.day() == date) {
            Some(index) => index,
            None => {
                tracing::debug!("Created daily entry for {}", date);
                self.daily_entries.push(DailyEntry::new(local_midnight(date)));
                self.daily_entries.len() - 1
            }
        };
        &mut self.daily_entries[index]
    }

    fn recompute_stats(&mut self) {
        self.stats = stats::compute(
            &self.stats,
            &self.daily_entries,
            &self.weight_entries,
            self.clock.now(),
        );
    }

    fn persist_daily_entries(&mut self) -> Result<()> {
        blob::save_json(&mut self.blobs, DAILY_ENTRIES_KEY, &self.daily_entries)
    }

    fn persist_catalog(&mut self) -> Result<()> {
        blob::save_json(&mut self.blobs, SAVED_FOOD_ITEMS_KEY, &self.saved_food_items)
    }

    fn persist_settings(&mut self) -> Result<()> {
        blob::save_json(&mut self.blobs, USER_SETTINGS_KEY, &self.settings)
    }
}
