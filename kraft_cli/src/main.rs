use clap::{Parser, Subcommand};
use kraft_core::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "kraft")]
#[command(about = "Strength training exercise list and workout tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the exercise list (default)
    List,

    /// Add an exercise to the end of the list
    Add {
        name: String,

        /// Base weight in kg
        #[arg(long)]
        weight: Option<String>,

        /// Number of additional plates
        #[arg(long, default_value_t = 0)]
        plates: u8,
    },

    /// Add a section header to the end of the list
    Header { name: String },

    /// Edit an exercise or header
    Edit {
        id: EntryId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        weight: Option<String>,

        #[arg(long)]
        plates: Option<u8>,
    },

    /// Delete an exercise or header
    Delete {
        id: EntryId,

        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Move an entry one position up or down
    Move { id: EntryId, direction: Direction },

    /// Delete the whole exercise list
    Clear {
        #[arg(long, short)]
        yes: bool,
    },

    /// Start a training session from the current list
    Start,

    /// Show the training in progress
    Status {
        /// Include completed exercises
        #[arg(long)]
        all: bool,
    },

    /// Mark an exercise of the training as done
    Done {
        id: EntryId,

        /// Weight used, if different from the planned weight
        #[arg(long)]
        weight: Option<String>,

        #[arg(long)]
        plates: Option<u8>,
    },

    /// Mark an exercise of the training as not done
    Undo { id: EntryId },

    /// Change the weight of an exercise for this training only
    Weight {
        id: EntryId,
        weight: String,

        #[arg(long)]
        plates: Option<u8>,
    },

    /// End the training in progress
    End {
        #[arg(long, short)]
        yes: bool,
    },

    /// Export the exercise list as a backup file
    Export {
        /// Output path (defaults to a dated backup file name)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write CSV instead of JSON (to stdout unless --out is given)
        #[arg(long)]
        csv: bool,
    },

    /// Import exercises from a backup file
    Import { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        kraft_core::logging::init_with_level("debug");
    } else {
        kraft_core::logging::init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());

    let storage = Storage::open(&data_dir, config.storage_options())?;

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => cmd_list(&storage),
        Commands::Add {
            name,
            weight,
            plates,
        } => {
            let weight = weight.as_deref().map_or(0.0, parse_weight);
            let id = storage.add_exercise(&name, weight, plates)?;
            println!("✓ Added exercise {}", id);
            Ok(())
        }
        Commands::Header { name } => {
            let id = storage.add_header(&name)?;
            println!("✓ Added header {}", id);
            Ok(())
        }
        Commands::Edit {
            id,
            name,
            weight,
            plates,
        } => cmd_edit(&storage, id, name, weight, plates),
        Commands::Delete { id, yes } => {
            if !yes && !confirm(&format!("Delete entry {}?", id))? {
                println!("Cancelled.");
                return Ok(());
            }
            if storage.delete(id)? {
                println!("✓ Deleted entry {}", id);
            } else {
                println!("Nothing to delete.");
            }
            Ok(())
        }
        Commands::Move { id, direction } => {
            if storage.move_entry(id, direction)? {
                println!("✓ Moved entry {} {}", id, direction_label(direction));
            } else {
                println!("Entry {} cannot move {}.", id, direction_label(direction));
            }
            Ok(())
        }
        Commands::Clear { yes } => {
            if !yes && !confirm("Delete the whole exercise list?")? {
                println!("Cancelled.");
                return Ok(());
            }
            let removed = storage.clear_all()?;
            println!("✓ Removed {} entries", removed);
            Ok(())
        }
        Commands::Start => {
            let session = storage.start()?;
            println!("✓ Training started");
            print_session(&session, config.training.show_completed, &config);
            Ok(())
        }
        Commands::Status { all } => {
            match storage.current()? {
                Some(session) => {
                    print_session(&session, all || config.training.show_completed, &config)
                }
                None => println!("No training in progress."),
            }
            Ok(())
        }
        Commands::Done { id, weight, plates } => cmd_done(&storage, &config, id, weight, plates),
        Commands::Undo { id } => {
            let session = storage.set_completed(id, false, false)?;
            report_session_update(session, id, "not done")
        }
        Commands::Weight { id, weight, plates } => {
            cmd_weight(&storage, id, parse_weight(&weight), plates)
        }
        Commands::End { yes } => {
            if storage.current()?.is_none() {
                println!("No training in progress.");
                return Ok(());
            }
            if !yes && !confirm("End the training?")? {
                println!("Cancelled.");
                return Ok(());
            }
            storage.end()?;
            println!("✓ Training ended");
            Ok(())
        }
        Commands::Export { out, csv } => cmd_export(&storage, out, csv),
        Commands::Import { path } => {
            let summary = storage.import_file(&path)?;
            print!("✓ Imported {} entries", summary.imported);
            if summary.skipped > 0 {
                print!(", {} skipped", summary.skipped);
            }
            println!();
            Ok(())
        }
    }
}

fn cmd_list(storage: &Storage) -> Result<()> {
    let entries = storage.list_all()?;
    if entries.is_empty() {
        println!("No exercises yet. Add your first one with `kraft add <name>`.");
        return Ok(());
    }

    for (index, entry) in entries.iter().enumerate() {
        match entry.load {
            None => {
                if index > 0 {
                    println!();
                }
                println!("{:>4}  ── {} ──", entry.id, entry.name);
            }
            Some(load) => {
                println!(
                    "{:>4}     {}  {}",
                    entry.id,
                    entry.name,
                    format_load(&load, storage.options().plate_increment_kg)
                );
            }
        }
    }
    Ok(())
}

fn cmd_edit(
    storage: &Storage,
    id: EntryId,
    name: Option<String>,
    weight: Option<String>,
    plates: Option<u8>,
) -> Result<()> {
    let entry = storage.get(id)?.ok_or(Error::NotFound(id))?;
    let current = entry.load.unwrap_or_default();

    let name = name.unwrap_or(entry.name);
    let weight = weight.as_deref().map_or(current.base_weight, parse_weight);
    let plates = plates.unwrap_or(current.additional_plates);

    let updated = storage.update(id, &name, weight, plates)?;
    println!("✓ Updated entry {} ({})", updated.id, updated.name);
    Ok(())
}

fn cmd_done(
    storage: &Storage,
    config: &Config,
    id: EntryId,
    weight: Option<String>,
    plates: Option<u8>,
) -> Result<()> {
    let remember = config.training.remember_weight_on_complete;

    let session = if weight.is_none() && plates.is_none() {
        storage.set_completed(id, true, remember)?
    } else {
        let current = current_load(storage, id)?;
        let update = SessionUpdate {
            weight: weight.as_deref().map_or(current.base_weight, parse_weight),
            completed: true,
            plates: plates.unwrap_or(current.additional_plates),
        };
        storage.update_session_entry(id, update, remember)?
    };

    if let Some(session) = &session {
        if session.progress().is_finished() {
            println!("🎉 All exercises done!");
        }
    }
    report_session_update(session, id, "done")
}

fn cmd_weight(storage: &Storage, id: EntryId, weight: f64, plates: Option<u8>) -> Result<()> {
    let completed = storage
        .current()?
        .and_then(|s| s.entry(id).map(SessionEntry::is_completed))
        .unwrap_or(false);
    let current = current_load(storage, id)?;

    let update = SessionUpdate {
        weight,
        completed,
        plates: plates.unwrap_or(current.additional_plates),
    };
    let session = storage.update_session_entry(id, update, false)?;
    report_session_update(session, id, "updated")
}

fn cmd_export(storage: &Storage, out: Option<PathBuf>, csv: bool) -> Result<()> {
    if csv {
        let rows = match &out {
            Some(path) => storage.export_csv(std::fs::File::create(path)?)?,
            None => storage.export_csv(io::stdout().lock())?,
        };
        if let Some(path) = &out {
            println!("✓ Exported {} entries to {}", rows, path.display());
        }
        return Ok(());
    }

    let path = out.unwrap_or_else(|| {
        Path::new(".").join(backup_file_name(chrono::Local::now().date_naive()))
    });
    let document = storage.write_export(&path)?;
    println!(
        "✓ Exported {} entries to {}",
        document.exercises.len(),
        path.display()
    );
    Ok(())
}

/// Load of a session entry, falling back to defaults when it is missing
fn current_load(storage: &Storage, id: EntryId) -> Result<Load> {
    Ok(storage
        .current()?
        .and_then(|s| s.entry(id).and_then(|e| e.load))
        .unwrap_or_default())
}

fn report_session_update(session: Option<TrainingSession>, id: EntryId, what: &str) -> Result<()> {
    match session {
        Some(session) => {
            let progress = session.progress();
            println!(
                "✓ Entry {} {} ({} of {} exercises done)",
                id, what, progress.completed, progress.total
            );
        }
        None => println!("No training in progress, or entry {} is not part of it.", id),
    }
    Ok(())
}

fn print_session(session: &TrainingSession, show_completed: bool, config: &Config) {
    let progress = session.progress();
    println!(
        "\nStarted {} · {} of {} exercises done\n",
        session
            .started_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M"),
        progress.completed,
        progress.total
    );

    let visible = session.visible_entries(show_completed);
    if visible.is_empty() {
        if progress.total > 0 {
            println!("  All exercises done! Use `kraft status --all` to see them.");
        } else {
            println!("  No exercises in this training.");
        }
        return;
    }

    for entry in visible {
        match (entry.completed, entry.load) {
            (Some(done), Some(load)) => println!(
                "{:>4}  [{}] {}  {}",
                entry.id,
                if done { "x" } else { " " },
                entry.name,
                format_load(&load, config.plates.increment_kg)
            ),
            _ => println!("{:>4}  ── {} ──", entry.id, entry.name),
        }
    }
}

fn format_load(load: &Load, increment_kg: f64) -> String {
    match load.additional_plates {
        0 => format!("{} kg", load.base_weight),
        1 => format!(
            "{} kg + 1 plate = {} kg",
            load.base_weight,
            load.total(increment_kg)
        ),
        n => format!(
            "{} kg + {} plates = {} kg",
            load.base_weight,
            n,
            load.total(increment_kg)
        ),
    }
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "up",
        Direction::Down => "down",
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
