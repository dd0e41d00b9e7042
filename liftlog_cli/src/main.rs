use clap::{Parser, Subcommand};
use liftlog_core::csv_rollup::{cleanup_processed_logs, rollup_log};
use liftlog_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "Strength training log with cycle progression", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default workout definitions
    Init {
        /// Overwrite existing definitions
        #[arg(long)]
        force: bool,
    },

    /// Show today's workout for a group (A, B or C)
    Show {
        group: String,
    },

    /// Log a completed exercise and advance its progression
    Log {
        /// Workout group (A, B or C)
        #[arg(long)]
        group: String,

        #[arg(long)]
        exercise: String,

        #[arg(long, allow_hyphen_values = true)]
        sets: String,

        #[arg(long, allow_hyphen_values = true)]
        reps: String,

        /// Weight used, in lbs
        #[arg(long, allow_hyphen_values = true)]
        weight: String,

        /// Rate of perceived exertion, 1-10
        #[arg(long, allow_hyphen_values = true)]
        rpe: String,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Override the cycle base weight of an exercise
    BaseWeight {
        #[arg(long)]
        exercise: String,

        /// New base weight, in lbs
        #[arg(long, allow_hyphen_values = true)]
        weight: String,
    },

    /// Show what is currently scheduled for an exercise
    Prescription {
        #[arg(long)]
        exercise: String,
    },

    /// Show recent log entries
    History {
        /// Only entries for this exercise
        #[arg(long)]
        exercise: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Roll up the workout log WAL to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    liftlog_core::logging::init_with_level(&config.logging.level);

    // Determine data directory
    let paths = DataPaths::new(cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone()));
    tracing::debug!("Using data directory {:?}", paths.data_dir);

    let (caption, result) = match cli.command {
        Commands::Init { force } => (
            "Failed to initialize".to_string(),
            cmd_init(&paths, force),
        ),
        Commands::Show { group } => (
            format!("Failed to show workout {}", group.trim()),
            cmd_show(&paths, &group),
        ),
        Commands::Log {
            group,
            exercise,
            sets,
            reps,
            weight,
            rpe,
            json,
        } => {
            let form = LogForm {
                workout_group: group,
                exercise_name: exercise,
                sets_performed: sets,
                reps_performed: reps,
                weight_used: weight,
                rpe,
            };
            (
                format!("Failed to log {}", form.exercise_name.trim()),
                cmd_log(&paths, &form, json),
            )
        }
        Commands::BaseWeight { exercise, weight } => (
            format!("Failed to update base weight for {}", exercise.trim()),
            cmd_base_weight(&paths, &exercise, &weight),
        ),
        Commands::Prescription { exercise } => (
            format!("Failed to read prescription for {}", exercise.trim()),
            cmd_prescription(&paths, &exercise),
        ),
        Commands::History { exercise, limit } => (
            "Failed to load history".to_string(),
            cmd_history(&paths, exercise.as_deref(), limit),
        ),
        Commands::Rollup { cleanup } => (
            "Failed to roll up".to_string(),
            cmd_rollup(&paths, cleanup),
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("{}: {}", caption, e);
            ExitCode::FAILURE
        }
    }
}

fn open_workout(paths: &DataPaths) -> Result<Workout<CsvExerciseStore, JsonlLogSink>> {
    let definitions = paths.definitions();
    if !definitions.exists() {
        return Err(Error::Store(format!(
            "No workout definitions at {}. Run `liftlog init` first.",
            definitions.display()
        )));
    }

    Ok(Workout::new(
        CsvExerciseStore::new(definitions),
        JsonlLogSink::new(paths.wal()),
    ))
}

fn cmd_init(paths: &DataPaths, force: bool) -> Result<()> {
    let definitions = paths.definitions();
    let _lock = DataDirLock::acquire(&paths.lock())?;

    if definitions.exists() && !force {
        return Err(Error::Validation(format!(
            "Workout definitions already exist at {}. Use --force to overwrite.",
            definitions.display()
        )));
    }

    let catalog = catalog::get_default_catalog();
    let errors = catalog::validate(catalog);
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    std::fs::create_dir_all(paths.wal_dir())?;
    CsvExerciseStore::create(&definitions, catalog)?;

    println!("✓ Wrote {} exercises", catalog.len());
    println!("  Definitions: {}", definitions.display());
    Ok(())
}

fn cmd_show(paths: &DataPaths, group: &str) -> Result<()> {
    let group: WorkoutGroup = group.parse()?;
    let workout = open_workout(paths)?;
    let details = workout.workout_details(group)?;

    println!("Workout {}", group);
    if details.is_empty() {
        println!("  (no exercises)");
        return Ok(());
    }

    for detail in &details {
        let p = &detail.prescription;
        print!(
            "  {}: {} x {} @ {} lbs",
            detail.name,
            p.sets,
            p.reps,
            display_weight(p.weight)
        );
        match p.base_weight {
            Some(base) => println!(" (base {})", base),
            None => println!(),
        }
    }
    Ok(())
}

fn cmd_log(paths: &DataPaths, form: &LogForm, json: bool) -> Result<()> {
    let _lock = DataDirLock::acquire(&paths.lock())?;
    let workout = open_workout(paths)?;
    let outcome = workout.log_performance(form)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("✓ {}", outcome.message);
    println!(
        "  Next: {} x {} @ {} lbs",
        outcome.next.sets,
        outcome.next.reps,
        display_weight(outcome.next.weight)
    );
    Ok(())
}

fn cmd_base_weight(paths: &DataPaths, exercise: &str, weight: &str) -> Result<()> {
    let _lock = DataDirLock::acquire(&paths.lock())?;
    let workout = open_workout(paths)?;
    let message = workout.set_cycle_base_weight(exercise, weight)?;
    println!("✓ {}", message);
    Ok(())
}

fn cmd_prescription(paths: &DataPaths, exercise: &str) -> Result<()> {
    let workout = open_workout(paths)?;
    let p = workout.current_prescription(exercise)?;

    println!("{}", exercise.trim());
    println!("  Sets: {}", p.sets);
    println!("  Reps: {}", p.reps);
    println!("  Weight: {}", display_weight(p.weight));
    println!("  Base weight: {}", display_weight(p.base_weight));
    Ok(())
}

fn cmd_history(paths: &DataPaths, exercise: Option<&str>, limit: usize) -> Result<()> {
    let entries = load_log_history(&paths.wal(), &paths.archive(), exercise)?;

    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    for entry in entries.iter().take(limit) {
        let step = entry
            .cycle_step_at_logging
            .map(|s| format!("step {}", s))
            .unwrap_or_else(|| "N/A".into());
        println!(
            "{}  {}  {}: {} x {} @ {} lbs, RPE {} ({})",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.workout_group,
            entry.exercise_name,
            entry.sets_performed,
            entry.reps_performed,
            entry.weight_used,
            entry.rpe,
            step
        );
    }
    Ok(())
}

fn cmd_rollup(paths: &DataPaths, cleanup: bool) -> Result<()> {
    let wal_path = paths.wal();
    let csv_path = paths.archive();

    if !wal_path.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let _lock = DataDirLock::acquire(&paths.lock())?;
    let count = rollup_log(&wal_path, &csv_path)?;

    println!("✓ Rolled up {} log entries to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        let cleaned = cleanup_processed_logs(&paths.wal_dir())?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}
