//! liftlog - workout history reconciliation and training analytics

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use liftlog::config::DEFAULT_COMPARISON_WINDOW;
use liftlog::db::{Database, SessionRecord};
use liftlog::{HistoryConfig, WorkoutHistory};

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(author, version, about = "Workout history reconciliation and training analytics")]
struct Cli {
    /// SQLite database path
    #[arg(long, env = "LIFTLOG_DB", default_value = "liftlog.db")]
    db: String,

    /// Earlier sessions of a plan searched for progression
    #[arg(long, env = "LIFTLOG_COMPARISON_WINDOW", default_value_t = DEFAULT_COMPARISON_WINDOW)]
    comparison_window: usize,

    /// Do not attach progression deltas to session details
    #[arg(long, env = "LIFTLOG_NO_PROGRESSION")]
    no_progression: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List completed workouts of a user
    List {
        #[arg(short, long)]
        user: String,

        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show one workout in canonical form (JSON)
    Show { session_id: String },

    /// Show one exercise of a workout with its progression (JSON)
    Exercise {
        session_id: String,
        exercise_ref: String,
    },

    /// Delete a workout owned by a user
    Delete {
        session_id: String,

        #[arg(short, long)]
        user: String,
    },

    /// Import history records from a JSON file (one record or an array)
    Import { file: PathBuf },
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let db = Database::open(&cli.db).with_context(|| format!("opening {}", cli.db))?;
    let config = HistoryConfig {
        comparison_window: cli.comparison_window,
        attach_progression: !cli.no_progression,
    };
    let history = WorkoutHistory::new(db, config);

    match cli.command {
        Commands::List { user, limit } => {
            let sessions = history.get_completed_sessions(&user)?;
            println!("Completed workouts:");
            println!("{:-<72}", "");
            for s in sessions.iter().take(limit) {
                println!(
                    "{} | {:24} | {:2} exercises | {}",
                    s.completed_at.format("%Y-%m-%d %H:%M"),
                    s.session_name.as_deref().unwrap_or("-"),
                    s.exercises.len(),
                    s.duration_minutes
                        .map(|d| format!("{d:.0} min"))
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }

        Commands::Show { session_id } => match history.get_session_details(&session_id)? {
            Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
            None => println!("Session {} not found", session_id),
        },

        Commands::Exercise {
            session_id,
            exercise_ref,
        } => match history.get_exercise_details(&session_id, &exercise_ref)? {
            Some(exercise) => println!("{}", serde_json::to_string_pretty(&exercise)?),
            None => println!("Exercise {} not found in session {}", exercise_ref, session_id),
        },

        Commands::Delete { session_id, user } => {
            if history.delete_session(&session_id, &user)? {
                println!("Deleted session {}", session_id);
            } else {
                println!("Session {} not found for user {}", session_id, user);
            }
        }

        Commands::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let records: Vec<SessionRecord> = match serde_json::from_str::<Value>(&text)? {
                Value::Array(items) => items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<_, _>>()?,
                single => vec![serde_json::from_value(single)?],
            };
            for record in &records {
                history.store().add_history_record(record)?;
            }
            println!("Imported {} records", records.len());
        }
    }

    Ok(())
}
