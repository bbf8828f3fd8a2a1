use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use platewise_core::clock::local_midnight;
use platewise_core::*;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "platewise")]
#[command(about = "Daily nutrition and body-weight tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's intake against the calorie goal (default)
    Today,

    /// Log a food item
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        calories: u32,

        #[arg(long, default_value_t = 0)]
        protein: u32,

        #[arg(long, default_value_t = 0)]
        carbs: u32,

        #[arg(long, default_value_t = 0)]
        fat: u32,

        /// Dietary tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Day to log on (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Remove a logged food item by id
    Remove {
        #[arg(long)]
        id: Uuid,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Log a previously used food item again
    Reuse {
        #[arg(long)]
        name: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Record body weight in the preferred units
    Weight {
        #[arg(allow_negative_numbers = true)]
        value: f64,

        /// Day of the measurement (YYYY-MM-DD), defaults to now
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Set the daily calorie goal
    Goal {
        #[arg(allow_negative_numbers = true)]
        kcal: i64,
    },

    /// Set the language used for menu translations
    Language { language: String },

    /// Set preferred units (metric, imperial)
    Units { units: UnitSystem },

    /// Show rolling progress statistics
    Stats,

    /// List reusable food items
    Catalog,

    /// List weight history
    History,

    /// Analyze a menu photo and list the dishes found
    Scan {
        /// Menu photo (JPEG)
        #[arg(long)]
        image: PathBuf,

        /// Recorded vision service response to replay
        #[arg(long)]
        response: PathBuf,

        /// Log the dish with this number from the listing (repeatable)
        #[arg(long = "add")]
        add: Vec<usize>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Export the daily log and weight history as CSV
    Export {
        /// Output directory
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    platewise_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let mut store = Store::open(JsonFileStore::new(&data_dir), config.defaults.to_settings());

    match cli.command.unwrap_or(Commands::Today) {
        Commands::Today => cmd_today(&mut store),
        Commands::Add {
            name,
            calories,
            protein,
            carbs,
            fat,
            tags,
            date,
        } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::Other("Food name must not be empty".into()));
            }
            let item = FoodItem::new(name, calories, protein, carbs, fat)
                .with_tags(tags)
                .added_at(store.now());
            let date = date.unwrap_or_else(|| store.today());
            cmd_add(&mut store, item, date)
        }
        Commands::Remove { id, date } => {
            let date = date.unwrap_or_else(|| store.today());
            cmd_remove(&mut store, id, date)
        }
        Commands::Reuse { name, date } => {
            let date = date.unwrap_or_else(|| store.today());
            cmd_reuse(&mut store, &name, date)
        }
        Commands::Weight { value, date } => cmd_weight(&mut store, value, date),
        Commands::Goal { kcal } => cmd_goal(&mut store, kcal),
        Commands::Language { language } => {
            let language = language.trim();
            if language.is_empty() {
                return Err(Error::Other("Language must not be empty".into()));
            }
            store.update_language(language)?;
            println!("✓ Language set to {}", language);
            Ok(())
        }
        Commands::Units { units } => {
            store.update_preferred_units(units)?;
            println!("✓ Units set to {}", units);
            Ok(())
        }
        Commands::Stats => cmd_stats(&store),
        Commands::Catalog => cmd_catalog(&store),
        Commands::History => cmd_history(&store),
        Commands::Scan {
            image,
            response,
            add,
            date,
        } => {
            let date = date.unwrap_or_else(|| store.today());
            cmd_scan(&mut store, image, response, &add, date)
        }
        Commands::Export { out } => cmd_export(&store, out),
    }
}

fn cmd_today<S: BlobStore>(store: &mut Store<S>) -> Result<()> {
    let entry = store.get_or_create_todays_entry();
    let summary = store.summary_for(entry.day());

    display_summary(&summary);

    if entry.food_items.is_empty() {
        println!("  Nothing logged yet.");
    } else {
        for item in &entry.food_items {
            display_item(item);
        }
    }
    println!();
    Ok(())
}

fn cmd_add<S: BlobStore>(store: &mut Store<S>, item: FoodItem, date: NaiveDate) -> Result<()> {
    let id = item.id;
    let name = item.name.clone();
    let calories = item.calories;
    store.add_food_item_on(item, date)?;

    println!("✓ Logged {} ({} kcal) on {}", name, calories, date);
    println!("  id: {}", id);
    Ok(())
}

fn cmd_remove<S: BlobStore>(store: &mut Store<S>, id: Uuid, date: NaiveDate) -> Result<()> {
    if store.remove_food_item_on(id, date)? {
        println!("✓ Removed item {}", id);
    } else {
        println!("No item {} logged on {} - nothing removed.", id, date);
    }
    Ok(())
}

fn cmd_reuse<S: BlobStore>(store: &mut Store<S>, name: &str, date: NaiveDate) -> Result<()> {
    match store.add_from_catalog(name, date)? {
        Some(item) => {
            println!("✓ Logged {} ({} kcal) on {}", item.name, item.calories, date);
            println!("  id: {}", item.id);
            Ok(())
        }
        None => Err(Error::Other(format!("No saved food item named '{}'", name))),
    }
}

fn cmd_weight<S: BlobStore>(
    store: &mut Store<S>,
    value: f64,
    date: Option<NaiveDate>,
) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::Other("Weight must be a positive number".into()));
    }

    let units = store.settings().preferred_units;
    let at = date.map(local_midnight).unwrap_or_else(|| store.now());
    store.add_weight_entry_at(units.weight_to_kg(value), at)?;

    println!(
        "✓ Weight {:.1} {} recorded for {}",
        value,
        units.weight_label(),
        at.date_naive()
    );
    Ok(())
}

fn cmd_goal<S: BlobStore>(store: &mut Store<S>, kcal: i64) -> Result<()> {
    let goal = u32::try_from(kcal)
        .ok()
        .filter(|g| *g > 0)
        .ok_or_else(|| Error::Other("Calorie goal must be a positive number".into()))?;

    store.update_daily_calorie_goal(goal)?;
    println!("✓ Daily calorie goal set to {} kcal", goal);
    Ok(())
}

fn cmd_stats<S: BlobStore>(store: &Store<S>) -> Result<()> {
    let stats = store.stats();
    let units = store.settings().preferred_units;
    let unit = units.weight_label();

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  PROGRESS");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Streak:          {} days", stats.streak_days);
    println!("  Weekly avg:      {:.0} kcal", stats.weekly_average_calories);
    println!("  Monthly avg:     {:.0} kcal", stats.monthly_average_calories);
    println!(
        "  Weekly change:   {:+.1} {}",
        units.weight_from_kg(stats.weekly_weight_change),
        unit
    );
    println!(
        "  Monthly change:  {:+.1} {}",
        units.weight_from_kg(stats.monthly_weight_change),
        unit
    );
    println!();
    Ok(())
}

fn cmd_catalog<S: BlobStore>(store: &Store<S>) -> Result<()> {
    if store.catalog().is_empty() {
        println!("No saved food items yet.");
        return Ok(());
    }

    for item in store.catalog() {
        display_item(item);
    }
    Ok(())
}

fn cmd_history<S: BlobStore>(store: &Store<S>) -> Result<()> {
    if store.weight_entries().is_empty() {
        println!("No weight entries yet.");
        return Ok(());
    }

    let units = store.settings().preferred_units;
    for entry in store.weight_entries() {
        println!(
            "  {}  {:.1} {}",
            entry.date.format("%Y-%m-%d %H:%M"),
            units.weight_from_kg(entry.weight),
            units.weight_label()
        );
    }
    Ok(())
}

fn cmd_scan<S: BlobStore>(
    store: &mut Store<S>,
    image: PathBuf,
    response: PathBuf,
    selection: &[usize],
    date: NaiveDate,
) -> Result<()> {
    let image = std::fs::read(&image)?;
    let language = store.settings().language.clone();
    let service: Arc<dyn MenuVisionService> = Arc::new(ReplayVisionService::new(response));

    let (tx, rx) = mpsc::channel();
    let handle = vision::spawn_analysis(service, image, language, tx)?;

    // Block this thread until the worker answers; the store is only touched here.
    let outcome = rx
        .recv()
        .map_err(|_| Error::Vision(VisionError::ServiceUnavailable))?;
    if handle.join().is_err() {
        tracing::warn!("Menu vision worker panicked after replying");
    }

    let dishes = outcome.result?;
    if dishes.is_empty() {
        println!("No dishes found on the menu.");
        return Ok(());
    }

    // Reject the whole selection before anything is logged
    let picked: BTreeSet<usize> = selection.iter().copied().collect();
    if let Some(bad) = picked.iter().find(|n| **n == 0 || **n > dishes.len()) {
        return Err(Error::Other(format!(
            "No dish number {} on this menu (1-{})",
            bad,
            dishes.len()
        )));
    }

    for (n, dish) in dishes.iter().enumerate() {
        println!(
            "  {}. {} ({}) - {} kcal, P {}g / C {}g / F {}g",
            n + 1,
            dish.display_name(),
            dish.original_name,
            dish.calories_value(),
            dish.protein_value(),
            dish.carbs_value(),
            dish.fat_value()
        );
    }

    if picked.is_empty() {
        println!("\nNothing logged. Pass --add N to log a dish.");
        return Ok(());
    }

    let chosen: Vec<Dish> = picked.iter().map(|n| dishes[n - 1].clone()).collect();
    let items = store.log_dishes(&chosen, date)?;
    println!("\n✓ Logged {} dishes on {}", items.len(), date);
    for item in &items {
        display_item(item);
    }
    Ok(())
}

fn cmd_export<S: BlobStore>(store: &Store<S>, out: PathBuf) -> Result<()> {
    let daily_path = out.join("daily.csv");
    let weight_path = out.join("weight.csv");

    let days = export::export_daily_csv(store.daily_entries(), &daily_path)?;
    let weights = export::export_weight_csv(store.weight_entries(), &weight_path)?;

    println!("✓ Exported {} days to {}", days, daily_path.display());
    println!("✓ Exported {} weights to {}", weights, weight_path.display());
    Ok(())
}

fn display_summary(summary: &DailySummary) {
    const BAR_WIDTH: usize = 30;
    let filled = (summary.progress * BAR_WIDTH as f64).round() as usize;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  TODAY · {}", summary.date);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  {} / {} kcal",
        summary.total_calories, summary.calorie_goal
    );
    println!(
        "  [{}{}]",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled)
    );
    if summary.remaining_calories >= 0 {
        println!("  {} kcal remaining", summary.remaining_calories);
    } else {
        println!("  {} kcal over goal", -summary.remaining_calories);
    }
    println!(
        "  Protein {}g · Carbs {}g · Fat {}g",
        summary.total_protein, summary.total_carbs, summary.total_fat
    );
    println!();
}

fn display_item(item: &FoodItem) {
    let tags = if item.dietary_tags.is_empty() {
        String::new()
    } else {
        let joined: Vec<&str> = item.dietary_tags.iter().map(String::as_str).collect();
        format!(" [{}]", joined.join(", "))
    };

    println!(
        "  → {} - {} kcal (P {}g / C {}g / F {}g){}",
        item.name, item.calories, item.protein, item.carbs, item.fat, tags
    );
    println!("    id: {}", item.id);
}
