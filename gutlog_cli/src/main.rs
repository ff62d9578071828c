use chrono::Utc;
use clap::{Parser, Subcommand};
use gutlog_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gutlog")]
#[command(about = "Personal digestive-health tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// User the entry or report applies to
    #[arg(long, global = true, default_value_t = 1)]
    user: i64,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a meal (nutrients resolved from the food table)
    Food {
        /// Food name, e.g. "oatmeal"
        name: String,

        /// Amount eaten, in the given unit
        #[arg(long, default_value_t = 1.0)]
        quantity: f64,

        /// cup, gram, serving or slice
        #[arg(long, default_value = "serving")]
        unit: String,
    },

    /// Log a stool observation
    Stool {
        /// Bristol type (1-7)
        bristol: u8,

        /// Blood observed
        #[arg(long)]
        bleeding: bool,

        /// Urgency (1-5)
        #[arg(long, default_value_t = 3)]
        urgency: u8,

        /// Free-form note
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show rolling frequency and stool-quality analytics
    Analytics {
        /// Window length in days (default from config)
        #[arg(long)]
        days: Option<i64>,
    },

    /// Predict the next stool type from recent intake
    Predict,

    /// Roll up event WALs to the CSV archive
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    gutlog_core::logging::init();

    let cli = Cli::parse();

    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::Food {
            name,
            quantity,
            unit,
        } => cmd_food(data_dir, cli.user, &name, quantity, &unit, &config),
        Commands::Stool {
            bristol,
            bleeding,
            urgency,
            notes,
        } => cmd_stool(data_dir, cli.user, bristol, bleeding, urgency, notes, &config),
        Commands::Analytics { days } => cmd_analytics(data_dir, cli.user, days, &config),
        Commands::Predict => cmd_predict(data_dir, cli.user, &config),
        Commands::Rollup { cleanup } => cmd_rollup(data_dir, cleanup),
    }
}

fn build_engine(data_dir: PathBuf, config: &Config) -> Engine<JsonlEventStore, FoodTable> {
    Engine::new(
        JsonlEventStore::new(data_dir),
        FoodTable::with_custom(&config.nutrition.custom),
        config.clone(),
    )
}

fn cmd_food(
    data_dir: PathBuf,
    user: i64,
    name: &str,
    quantity: f64,
    unit: &str,
    config: &Config,
) -> Result<()> {
    let unit: QuantityUnit = match unit.parse() {
        Ok(unit) => unit,
        Err(e) => {
            eprintln!("✗ {}", e);
            return Err(e);
        }
    };

    let engine = build_engine(data_dir, config);

    match engine.log_food(user, name, quantity, unit, Utc::now()) {
        Ok(event) => {
            println!("✓ Logged: {} {} of {}", event.quantity, event.unit, event.food_name);
            println!(
                "  {:.1} kcal, {:.1} g fiber, {:.1} g fat, {:.1} g protein",
                event.nutrients.calories,
                event.nutrients.fiber,
                event.nutrients.fat,
                event.nutrients.protein
            );
            Ok(())
        }
        Err(Error::Lookup(msg)) => {
            eprintln!("✗ {}", msg);
            Err(Error::Lookup(msg))
        }
        Err(e) => Err(e),
    }
}

fn cmd_stool(
    data_dir: PathBuf,
    user: i64,
    bristol: u8,
    bleeding: bool,
    urgency: u8,
    notes: Option<String>,
    config: &Config,
) -> Result<()> {
    let bristol = match BristolType::new(bristol) {
        Ok(bristol) => bristol,
        Err(e) => {
            eprintln!("✗ {}", e);
            return Err(e);
        }
    };

    let engine = build_engine(data_dir, config);

    let event = engine.log_stool(StoolEntry {
        user_id: user,
        bristol,
        bleeding,
        urgency,
        notes,
        logged_at: Utc::now(),
    })?;

    let entry = scale_entry(event.bristol);
    println!(
        "✓ Logged: type {} ({}) — {}",
        event.bristol, entry.description, entry.status
    );
    Ok(())
}

fn cmd_analytics(
    data_dir: PathBuf,
    user: i64,
    days: Option<i64>,
    config: &Config,
) -> Result<()> {
    let engine = build_engine(data_dir, config);
    let result = engine.compute_analytics(user, days, Utc::now())?;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  DIGESTIVE ANALYTICS");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Window: {} days", result.frequency_data.len() - 1);
    println!("  Total logs: {}", result.total_logs);
    match result.average_bristol_score {
        Some(avg) => println!("  Average bristol score: {:.1}", avg),
        None => println!("  Average bristol score: no data yet"),
    }
    println!();

    for day in &result.frequency_data {
        let bar: String = std::iter::repeat('█').take(day.count as usize).collect();
        println!("  {}  {:<8} {}", day.date, bar, day.count);
    }

    println!();
    Ok(())
}

fn cmd_predict(data_dir: PathBuf, user: i64, config: &Config) -> Result<()> {
    let engine = build_engine(data_dir, config);

    match engine.predict_next(user, Utc::now()) {
        Ok(prediction) => {
            display_prediction(&prediction);
            Ok(())
        }
        Err(Error::InsufficientData { have, need }) => {
            println!("Not enough data yet for a prediction.");
            println!(
                "  {} of {} food/stool pairs logged — keep tracking!",
                have, need
            );
            Ok(())
        }
        Err(Error::NoFoodData) => {
            println!("No food logged in the current window — nothing to predict from.");
            println!("  Log some meals first to get predictions.");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn cmd_rollup(data_dir: PathBuf, cleanup: bool) -> Result<()> {
    let store = JsonlEventStore::new(&data_dir);

    let foods = if store.foods_wal_path().exists() {
        archive::rollup_foods(&store.foods_wal_path(), &store.foods_csv_path())?
    } else {
        0
    };
    let stools = if store.stools_wal_path().exists() {
        archive::rollup_stools(&store.stools_wal_path(), &store.stools_csv_path())?
    } else {
        0
    };

    if foods == 0 && stools == 0 {
        println!("No events in the WAL - nothing to roll up.");
    } else {
        println!("✓ Rolled up {} food and {} stool events to CSV", foods, stools);
        println!("  Archive: {}", data_dir.display());
    }

    if cleanup {
        let cleaned = archive::cleanup_processed_wals(&store.wal_dir())?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

fn display_prediction(prediction: &PredictionResult) {
    let entry = scale_entry(prediction.bristol);

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  NEXT STOOL FORECAST");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Predicted: type {} — {}", prediction.bristol, prediction.description);
    println!("  Outlook: {}", entry.status);
    println!();
    println!("  Based on recent intake:");
    println!(
        "  → {:.1} kcal across {} meals",
        prediction.food_summary.calories, prediction.food_summary.meal_count
    );
    println!(
        "  → {:.1} g fiber, {:.1} g fat, {:.1} g protein",
        prediction.food_summary.fiber,
        prediction.food_summary.fat,
        prediction.food_summary.protein
    );
    println!();
}
