use chrono::Local;
use clap::{Parser, Subcommand};
use repbook_core::schedule::{
    day_for_date, get_day_slot, parse_date_key, resolve_workout_refs, set_day_slot,
};
use repbook_core::config::WeightUnit;
use repbook_core::store::save_override;
use repbook_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repbook")]
#[command(about = "Workout tracker with live sessions and weekly schedules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override workout catalog (JSON array of workouts)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what is planned for today (default)
    Today,

    /// List workouts in the catalog
    Workouts,

    /// Run a workout session
    Start {
        /// Workout id from `repbook workouts`
        workout_id: String,

        /// Complete every set and save without prompting (for testing)
        #[arg(long)]
        auto_complete: bool,
    },

    /// Weekly schedule
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Workouts pinned to specific dates
    Date {
        #[command(subcommand)]
        action: DateAction,
    },

    /// Recent performances
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,

        /// Window in days
        #[arg(long, default_value_t = 30)]
        days: i64,

        /// Every performance of one workout id, ignoring --days
        #[arg(long)]
        workout: Option<String>,
    },

    /// Progress statistics
    Stats {
        #[command(subcommand)]
        action: StatsAction,
    },

    /// Export all performances to CSV
    Export {
        /// Destination (defaults to <data-dir>/performances.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ScheduleAction {
    /// Print all seven days
    Show,
    /// Replace one day's workouts (no ids clears the day)
    Set { day: String, workout_ids: Vec<String> },
    /// Empty every day
    Clear,
}

#[derive(Subcommand)]
enum DateAction {
    /// Workouts pinned to a date (YYYY-MM-DD)
    Show { date: String },
    /// Replace a date's workouts (no ids clears the date)
    Set { date: String, workout_ids: Vec<String> },
    /// All pinned dates between two dates, inclusive
    Range { start: String, end: String },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Per-set breakdown of one performance (full id or prefix)
    Show { id: String },
}

#[derive(Subcommand)]
enum StatsAction {
    /// Progression of one exercise
    Exercise { name: String },
    /// Volume per day
    Totals,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        repbook_core::logging::init_with_level("debug");
    } else {
        repbook_core::logging::init();
    }

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = DataPaths::new(&data_dir);
    tracing::debug!("Using data directory {:?}", data_dir);

    let catalog = match cli.catalog.or_else(|| config.catalog.path.clone()) {
        Some(path) => load_catalog(&path)?,
        None => build_default_catalog(),
    };

    match cli.command {
        Some(Commands::Today) | None => cmd_today(&paths),
        Some(Commands::Workouts) => cmd_workouts(&catalog),
        Some(Commands::Start {
            workout_id,
            auto_complete,
        }) => cmd_start(&paths, &catalog, &config, &workout_id, auto_complete),
        Some(Commands::Schedule { action }) => cmd_schedule(&paths, &catalog, action),
        Some(Commands::Date { action }) => cmd_date(&paths, &catalog, action),
        Some(Commands::History {
            action,
            days,
            workout,
        }) => cmd_history(&paths, &config, action, days, workout.as_deref()),
        Some(Commands::Stats { action }) => cmd_stats(&paths, &config, action),
        Some(Commands::Export { output }) => {
            let output = output.unwrap_or_else(|| paths.export_csv.clone());
            let performances = read_performances(&paths.performances)?;
            let rows = repbook_core::export::export_performances_csv(&performances, &output)?;
            println!("✓ Exported {} sets to {}", rows, output.display());
            Ok(())
        }
    }
}

// ============================================================================
// Planning
// ============================================================================

fn cmd_today(paths: &DataPaths) -> Result<()> {
    let today = Local::now().date_naive();
    let day = day_for_date(today);

    let schedule = Schedule::load(&paths.schedule)?;
    let overrides = DateOverrides::load(&paths.date_overrides)?;

    println!("{} {}", day, today.format("%Y-%m-%d"));
    println!();
    println!("  Weekly plan:");
    print_refs(get_day_slot(&schedule, day));
    println!("  Pinned to this date:");
    print_refs(overrides.get(today));
    Ok(())
}

fn cmd_workouts(catalog: &Catalog) -> Result<()> {
    for workout in catalog.list() {
        println!(
            "{:<16} {} ({}, {} min, {} exercises)",
            workout.id,
            workout.name,
            workout.workout_type,
            workout.duration,
            workout.exercises.len()
        );
    }
    Ok(())
}

fn cmd_schedule(paths: &DataPaths, catalog: &Catalog, action: ScheduleAction) -> Result<()> {
    let (previous, next) = match action {
        ScheduleAction::Show => {
            let schedule = Schedule::load(&paths.schedule)?;
            for slot in schedule.days() {
                println!("{}", slot.day);
                print_refs(&slot.workouts);
            }
            return Ok(());
        }
        ScheduleAction::Set { day, workout_ids } => {
            let refs = resolve_checked(catalog, &workout_ids);
            Schedule::update(&paths.schedule, |current| set_day_slot(current, &day, refs))?
        }
        ScheduleAction::Clear => Schedule::update(&paths.schedule, |current| Ok(current.cleared()))?,
    };

    let changed = repbook_core::schedule::changed_days(&previous, &next);
    if changed.is_empty() {
        println!("Schedule unchanged.");
        return Ok(());
    }

    for day in changed {
        println!("✓ {} updated", day);
        print_refs(get_day_slot(&next, day));
    }
    Ok(())
}

fn cmd_date(paths: &DataPaths, catalog: &Catalog, action: DateAction) -> Result<()> {
    match action {
        DateAction::Show { date } => {
            let overrides = DateOverrides::load(&paths.date_overrides)?;
            let date = parse_date_key(&date)?;
            println!("{} ({})", date, day_for_date(date));
            print_refs(overrides.get(date));
        }
        DateAction::Set { date, workout_ids } => {
            let refs = resolve_checked(catalog, &workout_ids);
            let overrides = save_override(&paths.date_overrides, &date, refs)?;
            let date = parse_date_key(&date)?;
            println!("✓ {} updated", date);
            print_refs(overrides.get(date));
        }
        DateAction::Range { start, end } => {
            let overrides = DateOverrides::load(&paths.date_overrides)?;
            let entries = overrides.range(parse_date_key(&start)?, parse_date_key(&end)?)?;
            if entries.is_empty() {
                println!("Nothing pinned between {} and {}.", start, end);
            }
            for (date, refs) in entries {
                println!("{} ({})", date, day_for_date(date));
                print_refs(refs);
            }
        }
    }
    Ok(())
}

/// Resolve ids, telling the user about any that were dropped
fn resolve_checked(catalog: &Catalog, ids: &[String]) -> Vec<WorkoutRef> {
    let refs = resolve_workout_refs(ids, catalog);
    for id in ids {
        if catalog.get_by_id(id).is_none() {
            eprintln!("Unknown workout id '{}' ignored", id);
        }
    }
    refs
}

fn print_refs(refs: &[WorkoutRef]) {
    if refs.is_empty() {
        println!("    (rest day)");
    }
    for r in refs {
        println!("    • {} [{}, {} min]", r.name, r.workout_type, r.duration);
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// Prints events for the user and logs them
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, event: &SessionEvent) {
        LogNotifier.notify(event);
        println!("  ⏰ {}", event.message());
    }
}

fn cmd_start(
    paths: &DataPaths,
    catalog: &Catalog,
    config: &Config,
    workout_id: &str,
    auto_complete: bool,
) -> Result<()> {
    let workout = catalog
        .get_by_id(workout_id)
        .ok_or_else(|| Error::NotFound(format!("workout {}", workout_id)))?;

    let mut session = Session::start(workout, &config.rest)?;
    let mut notifier = ConsoleNotifier;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", workout.name.to_uppercase());
    println!("╰─────────────────────────────────────────╯");

    let record = if auto_complete {
        let mut clock = ManualClock::new();
        run_auto(&mut session, &mut clock, &mut notifier, workout.duration.saturating_mul(60))?
    } else {
        let mut clock = SystemClock::new();
        match run_interactive(&mut session, &mut clock, &mut notifier, config)? {
            Some(record) => record,
            None => {
                println!("\nWorkout discarded.");
                return Ok(());
            }
        }
    };

    let mut sink = JsonlPerformanceLog::new(&paths.performances);
    let stored = sink.save(record)?;

    println!("\n✓ Workout completed and saved!");
    println!("  Duration: {}", format_clock(stored.duration));
    println!(
        "  Exercises: {}/{} complete",
        stored.completion_stats.completed_exercises, stored.completion_stats.total_exercises
    );
    println!(
        "  Volume: {} {} ({} reps)",
        stored.total_weight, config.display.units, stored.total_reps
    );
    Ok(())
}

/// Tick through every set, completing each one
fn run_auto<N: Notifier>(
    session: &mut Session,
    clock: &mut ManualClock,
    notifier: &mut N,
    elapsed_seconds: u32,
) -> Result<PerformanceRecord> {
    session.play()?;
    loop {
        let (exercise, set) = session.cursor();
        session.toggle_set_completion(exercise, set)?;
        if session.is_last_set() {
            session.mark_exercise_complete(exercise)?;
        }
        match session.advance()? {
            Advance::WorkoutComplete => {
                notifier.notify(&SessionEvent::WorkoutComplete);
                break;
            }
            _ => session.skip_rest()?,
        }
    }

    clock.advance(elapsed_seconds);
    session.sync_clock(clock, notifier);
    session.finish()
}

fn print_help(units: WeightUnit) {
    println!("─────────────────────────────────────────");
    println!("  Enter/n   next set        p       previous set");
    println!("  c         toggle set done x       toggle exercise done");
    println!("  {:<10}set weight      r <n>   set reps", format!("w <{}>", units));
    println!("  note <t>  set note        log <t> workout notes");
    println!("  s         start/pause     skip    skip rest   + extend rest");
    println!("  f         finish & save   q       exit without saving");
}

fn print_status(session: &Session, units: WeightUnit) {
    let (e, s) = session.cursor();
    let exercise = session.current_exercise();
    let set = session.current_set();
    println!();
    println!(
        "[{}] {} {}  Exercise {}/{}  Set {}/{}  ({:.0}%)",
        format_clock(session.elapsed_seconds()),
        if session.is_running() { "▶" } else { "⏸" },
        exercise.exercise_name,
        e + 1,
        session.progress().len(),
        s + 1,
        exercise.sets.len(),
        session.completion_fraction() * 100.0
    );
    println!(
        "  {} {} × {} reps {}",
        set.weight,
        units,
        set.reps,
        if set.completed { "✓" } else { "" }
    );
    if session.rest_visible() {
        println!("  Rest: {}", format_clock(session.rest_remaining()));
    }
}

/// Returns `None` when the user exits without saving
fn run_interactive<C: Clock, N: Notifier>(
    session: &mut Session,
    clock: &mut C,
    notifier: &mut N,
    config: &Config,
) -> Result<Option<PerformanceRecord>> {
    let units = config.display.units;
    print_help(units);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print_status(session, units);
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            session.exit()?;
            return Ok(None);
        };
        let line = line?;
        session.sync_clock(clock, notifier);

        let (cmd, arg) = match line.trim().split_once(' ') {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line.trim(), ""),
        };
        let (e, s) = session.cursor();

        let outcome = match cmd {
            "" | "n" => session.advance().map(|advance| {
                if advance == Advance::WorkoutComplete {
                    notifier.notify(&SessionEvent::WorkoutComplete);
                }
            }),
            "p" => session.retreat().map(|_| ()),
            "c" => session.toggle_set_completion(e, s).map(|_| ()),
            "x" => session.mark_exercise_complete(e).map(|_| ()),
            "w" => parse_number::<f64>(arg)
                .and_then(|w| session.update_set(e, s, SetField::Weight(w)))
                .map(|_| ()),
            "r" => parse_number::<i64>(arg)
                .and_then(|r| session.update_set(e, s, SetField::Reps(r)))
                .map(|_| ()),
            "note" => session
                .update_set(e, s, SetField::Notes(arg.to_string()))
                .map(|_| ()),
            "log" => session.set_notes(arg),
            "s" => session.toggle_running(),
            "skip" => session.skip_rest(),
            "+" => session.extend_rest(config.rest.extend_step_seconds),
            "f" => return session.finish().map(Some),
            "q" => {
                print!("Your workout progress will be lost. Exit? [y/N] ");
                io::stdout().flush()?;
                let confirm = lines.next().transpose()?.unwrap_or_default();
                if confirm.trim().eq_ignore_ascii_case("y") {
                    session.exit()?;
                    return Ok(None);
                }
                Ok(())
            }
            "?" | "h" => {
                print_help(units);
                Ok(())
            }
            other => Err(Error::validation(format!("unknown command '{}'", other))),
        };

        if let Err(err) = outcome {
            match err {
                Error::Validation(msg) => notifier.notify(&SessionEvent::ValidationFailed(msg)),
                other => return Err(other),
            }
        }
    }
}

fn parse_number<T: std::str::FromStr>(arg: &str) -> Result<T> {
    arg.parse()
        .map_err(|_| Error::validation(format!("'{}' is not a number", arg)))
}

// ============================================================================
// History
// ============================================================================

fn cmd_history(
    paths: &DataPaths,
    config: &Config,
    action: Option<HistoryAction>,
    days: i64,
    workout: Option<&str>,
) -> Result<()> {
    let performances = read_performances(&paths.performances)?;
    let units = config.display.units;

    if let Some(HistoryAction::Show { id }) = action {
        let performance = repbook_core::history::performance_by_id(&performances, &id)?;
        print_performance(performance, units);
        return Ok(());
    }

    let listed = match workout {
        Some(workout_id) => {
            let listed = repbook_core::history::performances_for_workout(&performances, workout_id);
            if listed.is_empty() {
                println!("No performances of '{}'.", workout_id);
            }
            listed
        }
        None => {
            let listed =
                repbook_core::history::recent_performances(&performances, chrono::Utc::now(), days);
            if listed.is_empty() {
                println!("No workouts in the last {} days.", days);
            }
            listed
        }
    };

    for p in listed {
        println!(
            "{}  {}  {:<20} {}  {}/{} exercises  volume {} {} ({} reps)",
            short_id(p),
            p.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            p.workout_name,
            format_clock(p.duration),
            p.completion_stats.completed_exercises,
            p.completion_stats.total_exercises,
            p.total_weight,
            units,
            p.total_reps
        );
    }
    Ok(())
}

fn short_id(performance: &StoredPerformance) -> String {
    performance.id.to_string().chars().take(8).collect()
}

fn print_performance(p: &StoredPerformance, units: WeightUnit) {
    println!("{} ({})", p.workout_name, p.workout_id);
    println!("  Id: {}", p.id);
    println!(
        "  Date: {}",
        p.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    println!("  Duration: {}", format_clock(p.duration));
    println!(
        "  Exercises: {}/{} complete",
        p.completion_stats.completed_exercises, p.completion_stats.total_exercises
    );
    println!("  Volume: {} {} ({} reps)", p.total_weight, units, p.total_reps);
    if let Some(notes) = &p.notes {
        println!("  Notes: {}", notes);
    }

    for exercise in &p.exercises {
        let perf = &exercise.performance;
        println!();
        println!(
            "  {} {}/{} sets{}",
            perf.exercise_name,
            perf.completed_sets,
            perf.total_sets,
            if perf.completed { " ✓" } else { "" }
        );
        for set in &perf.sets {
            let note = if set.notes.is_empty() {
                String::new()
            } else {
                format!("  ({})", set.notes)
            };
            println!(
                "    Set {}: {} {} × {} {}{}",
                set.set_number,
                set.weight,
                units,
                set.reps,
                if set.completed { "✓" } else { "·" },
                note
            );
        }
    }
}

fn cmd_stats(paths: &DataPaths, config: &Config, action: StatsAction) -> Result<()> {
    let performances = read_performances(&paths.performances)?;
    let units = config.display.units;

    match action {
        StatsAction::Exercise { name } => {
            let stats = repbook_core::history::exercise_stats(&performances, &name);
            if stats.is_empty() {
                let known = repbook_core::history::exercise_names(&performances);
                println!("No data for '{}'. Known exercises: {}", name, known.join(", "));
                return Ok(());
            }
            println!("{}", name);
            for stat in stats {
                println!(
                    "  {}  max {} {units}  avg {:.1} {units}  volume {}  reps {}",
                    stat.date.with_timezone(&Local).format("%Y-%m-%d"),
                    stat.max_weight,
                    stat.avg_weight,
                    stat.total_weight,
                    stat.total_reps
                );
            }
        }
        StatsAction::Totals => {
            for total in repbook_core::history::daily_totals(&performances) {
                println!(
                    "{}  {} workouts  volume {} {}  reps {}",
                    total.date, total.count, total.total_weight, units, total.total_reps
                );
            }
        }
    }
    Ok(())
}
