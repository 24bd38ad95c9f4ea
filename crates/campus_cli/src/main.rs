//! Campus CLI
//!
//! Demo host for the campus selector widgets: scheduling forms, key-scripted
//! pickers, live student lookup and GPA what-if simulation against mock
//! services.

use anyhow::{Context, Result};
use campus_core::{Key, KeyboardEvent, Modifiers};
use campus_select::{
    selector, spawn_debounced_search, spawn_dependent_refresh, Choice, DebouncedScheduler,
    DependentState, SearchEvent, Selector, SelectorConfig, SelectorView,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod catalog;
mod config;
mod form;
mod services;

use catalog::{Catalog, Student};
use config::CampusConfig;
use form::ScheduleForm;
use services::{BookingService, GpaSimulation, GradingService, StudentDirectory, WhatIf};

/// Simulated time between scripted key presses
const STEP_MS: u64 = 50;

/// Extra wait after the last keystroke before the driver is stopped
const SETTLE_MARGIN_MS: u64 = 100;

#[derive(Parser)]
#[command(name = "campus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Campus selector demo host", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Selector configuration file (campus.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog JSON file replacing the built-in sample
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the free time slots of a room
    Schedule {
        /// Room id
        #[arg(short, long)]
        room: u32,
    },

    /// Drive a local selector with a key script
    Pick {
        /// Which list to pick from
        #[arg(value_enum)]
        kind: PickKind,

        /// Comma-separated script, e.g. "a,Enter" or "Down,Down,Enter"
        #[arg(short, long)]
        keys: String,
    },

    /// Replay a timed typing sequence against the student directory
    Search {
        /// Successive contents of the search box, e.g. "a al ali"
        #[arg(required = true)]
        keystrokes: Vec<String>,

        /// Milliseconds between keystrokes
        #[arg(long, default_value = "100")]
        gap_ms: u64,
    },

    /// Send debounced GPA what-if requests
    Whatif {
        /// Grade edits in order, e.g. "CS101=A CS240=B+"
        #[arg(required = true)]
        grades: Vec<String>,

        /// Milliseconds between edits
        #[arg(long, default_value = "100")]
        gap_ms: u64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PickKind {
    Room,
    Slot,
    Instructor,
    Course,
    Student,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = CampusConfig::load(cli.config.as_deref())?;
    let catalog = Catalog::load(cli.catalog.as_deref())?;

    match cli.command {
        Commands::Schedule { room } => cmd_schedule(catalog, &config, room).await,
        Commands::Pick { kind, keys } => cmd_pick(catalog, &config.selector, kind, &keys),
        Commands::Search { keystrokes, gap_ms } => {
            cmd_search(catalog, &config, keystrokes, gap_ms).await
        }
        Commands::Whatif { grades, gap_ms } => cmd_whatif(catalog, &config, &grades, gap_ms).await,
    }
}

async fn cmd_schedule(catalog: Catalog, config: &CampusConfig, room: u32) -> Result<()> {
    let name = catalog
        .room(room)
        .map(|r| r.name.clone())
        .with_context(|| format!("No room with id {room}"))?;

    let service = Arc::new(BookingService::new(
        catalog.slots,
        catalog.bookings,
        config.demo.slots_latency_ms,
        config.demo.bookings_latency_ms,
    ));
    let mut form = ScheduleForm::new(catalog.rooms, &config.selector)?;

    form.set_room(Some(room));
    for request in form.take_requests() {
        let response = spawn_dependent_refresh(Arc::clone(&service), request)
            .await
            .context("Slot refresh task failed")?;
        form.apply(response);
    }

    match form.slot_state() {
        DependentState::Ready { .. } => {
            let slots = form.available_slots();
            println!("{name}: {} free slot(s)", slots.len());
            for slot in slots {
                println!("  {:<8} {}", slot.id, slot.label);
            }
            Ok(())
        }
        DependentState::Failed { error, .. } => {
            anyhow::bail!("Could not load slots for {name}: {error}")
        }
        other => anyhow::bail!("Slots for {name} are not ready: {other:?}"),
    }
}

fn cmd_pick(catalog: Catalog, config: &SelectorConfig, kind: PickKind, keys: &str) -> Result<()> {
    let steps = parse_script(keys);
    info!("Picking {:?} with {} step(s)", kind, steps.len());

    match kind {
        PickKind::Room => report_pick(run_pick("room", catalog.rooms, config, &steps)?),
        PickKind::Slot => report_pick(run_pick("slot", catalog.slots, config, &steps)?),
        PickKind::Instructor => report_pick(run_pick(
            "instructor",
            catalog.instructors,
            config,
            &steps,
        )?),
        PickKind::Course => report_pick(run_pick("course", catalog.courses, config, &steps)?),
        PickKind::Student => report_pick(run_pick("student", catalog.students, config, &steps)?),
    }
    Ok(())
}

/// One step of a key script
#[derive(Clone, Debug, PartialEq)]
enum Step {
    Press(KeyboardEvent),
    Type(String),
    Erase,
}

/// Parse a comma-separated key script
///
/// Key names (`Down`, `Enter`, `Esc`, ...) become key presses, `Backspace`
/// erases one character, chords like `Ctrl+Down` are pressed with their
/// modifiers, anything else is typed.
fn parse_script(script: &str) -> Vec<Step> {
    script
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            if let Some(chord) = parse_chord(token) {
                return Step::Press(chord);
            }
            match token.parse::<Key>() {
                Ok(Key::Backspace) => Step::Erase,
                Ok(Key::Char(c)) => Step::Type(c.to_string()),
                Ok(Key::Space) => Step::Type(" ".to_string()),
                Ok(key) => Step::Press(KeyboardEvent::pressed(key)),
                Err(_) => Step::Type(token.to_string()),
            }
        })
        .collect()
}

/// Parse `Ctrl+Down`, `Alt+Shift+Enter` and the like
fn parse_chord(token: &str) -> Option<KeyboardEvent> {
    let (held, name) = token.rsplit_once('+')?;
    let key = name.trim().parse::<Key>().ok()?;
    let mut modifiers = Modifiers::default();
    for part in held.split('+') {
        match part.trim().to_ascii_lowercase().as_str() {
            "ctrl" | "control" => modifiers.ctrl = true,
            "alt" | "option" => modifiers.alt = true,
            "meta" | "cmd" | "super" => modifiers.meta = true,
            "shift" => modifiers.shift = true,
            _ => return None,
        }
    }
    Some(KeyboardEvent::pressed(key).with_modifiers(modifiers))
}

fn run_pick<T>(
    id: &str,
    options: Vec<T>,
    config: &SelectorConfig,
    steps: &[Step],
) -> Result<Selector<T>>
where
    T: Choice + 'static,
    T::Key: Display,
{
    let mut picker = selector(id)
        .options(options)
        .config(config.clone())
        .on_change(|key: &T::Key| info!("Committed {}", key))
        .build()?;

    let mut now = 0;
    picker.focus();
    for step in steps {
        now += STEP_MS;
        picker.tick(now);
        match step {
            Step::Press(event) => {
                let outcome = picker.key(event);
                debug!(key = %event.key, ?event.modifiers, ?outcome, "key pressed");
            }
            Step::Type(text) => {
                let typed = format!("{}{}", picker.display_text(), text);
                picker.input(typed, now);
            }
            Step::Erase => {
                let mut typed = picker.display_text().to_string();
                typed.pop();
                picker.input(typed, now);
            }
        }
    }
    Ok(picker)
}

fn report_pick<T>(picker: Selector<T>)
where
    T: Choice,
    T::Key: Display,
{
    print_view(&picker.view());
    match picker.value() {
        Some(key) => println!("value: {key}"),
        None => println!("value: (none)"),
    }
}

fn print_view(view: &SelectorView) {
    println!("input: {:?}", view.display_text);
    if !view.open {
        println!("(closed)");
        return;
    }
    for item in &view.items {
        let highlight = if item.highlighted { '>' } else { ' ' };
        let selected = if item.selected { '*' } else { ' ' };
        let disabled = if item.disabled { " (unavailable)" } else { "" };
        println!(" {highlight}{selected} {}{disabled}", item.label);
    }
    if let Some(reason) = view.empty {
        println!("  ({reason:?})");
    }
}

async fn cmd_search(
    catalog: Catalog,
    config: &CampusConfig,
    keystrokes: Vec<String>,
    gap_ms: u64,
) -> Result<()> {
    let directory = StudentDirectory::new(catalog.students, config.demo.search_latency_ms);
    let settle = config.selector.debounce_ms + directory.latency_for("") + SETTLE_MARGIN_MS;

    let min_query_len = config.selector.min_query_len;
    let scheduler = DebouncedScheduler::new(config.selector.debounce_ms)
        .with_gate(move |query: &String| query.trim().chars().count() >= min_query_len);
    let (handle, events) = spawn_debounced_search(Arc::new(directory), scheduler);

    let start = Instant::now();
    let typing = async {
        for query in &keystrokes {
            println!("{:>6} ms  typed {:?}", elapsed_ms(start), query);
            handle.query(query.clone())?;
            sleep(Duration::from_millis(gap_ms)).await;
        }
        sleep(Duration::from_millis(settle)).await;
        handle.shutdown().await
    };
    let (typed, fetches) = tokio::join!(typing, report_events(events, start, describe_students));
    typed?;

    println!("{} keystroke(s), {} fetch(es)", keystrokes.len(), fetches);
    Ok(())
}

async fn cmd_whatif(
    catalog: Catalog,
    config: &CampusConfig,
    grades: &[String],
    gap_ms: u64,
) -> Result<()> {
    let edits = grades
        .iter()
        .map(String::as_str)
        .map(parse_grade)
        .collect::<Result<Vec<_>>>()?;

    let service = GradingService::new(catalog.courses, config.demo.grading_latency_ms);
    let settle = config.selector.simulation_debounce_ms
        + config.demo.grading_latency_ms
        + SETTLE_MARGIN_MS;
    let scheduler = DebouncedScheduler::<WhatIf>::new(config.selector.simulation_debounce_ms);
    let (handle, events) = spawn_debounced_search(Arc::new(service), scheduler);

    let start = Instant::now();
    let editing = async {
        let mut what_if = WhatIf::new();
        for (course, grade) in edits {
            println!("{:>6} ms  {course} -> {grade}", elapsed_ms(start));
            what_if.insert(course, grade);
            handle.query(what_if.clone())?;
            sleep(Duration::from_millis(gap_ms)).await;
        }
        sleep(Duration::from_millis(settle)).await;
        handle.shutdown().await
    };
    let (edited, requests) = tokio::join!(editing, report_events(events, start, describe_gpa));
    edited?;

    println!("{} edit(s), {} simulation request(s)", grades.len(), requests);
    Ok(())
}

/// Parse `course=grade`
fn parse_grade(arg: &str) -> Result<(String, String)> {
    let (course, grade) = arg
        .split_once('=')
        .with_context(|| format!("Expected course=grade, got {arg:?}"))?;
    let course = course.trim();
    let grade = grade.trim();
    if course.is_empty() || grade.is_empty() {
        anyhow::bail!("Expected course=grade, got {arg:?}");
    }
    Ok((course.to_ascii_uppercase(), grade.to_string()))
}

/// Print driver events until the driver stops; returns the number of fetches
async fn report_events<Q, R>(
    mut events: mpsc::UnboundedReceiver<SearchEvent<Q, R>>,
    start: Instant,
    describe: impl Fn(&R) -> String,
) -> usize
where
    Q: std::fmt::Debug,
{
    let mut fetches = 0;
    while let Some(event) = events.recv().await {
        let at = elapsed_ms(start);
        match event {
            SearchEvent::Fetching { token, query } => {
                fetches += 1;
                println!("{at:>6} ms  fetch {token} {query:?}");
            }
            SearchEvent::Applied {
                token,
                result: Ok(result),
            } => println!("{at:>6} ms  applied {token}: {}", describe(&result)),
            SearchEvent::Applied {
                token,
                result: Err(err),
            } => println!("{at:>6} ms  failed {token}: {err}"),
            SearchEvent::Cleared => println!("{at:>6} ms  cleared"),
        }
    }
    fetches
}

fn describe_students(students: &Vec<Student>) -> String {
    if students.is_empty() {
        return "no students found".to_string();
    }
    let names: Vec<_> = students.iter().map(|s| s.label()).collect();
    format!("{} student(s): {}", students.len(), names.join(", "))
}

fn describe_gpa(simulation: &GpaSimulation) -> String {
    format!(
        "GPA {:.2} over {} credit(s) from {} course(s)",
        simulation.gpa, simulation.credits, simulation.graded
    )
}

fn elapsed_ms(start: Instant) -> u128 {
    start.elapsed().as_millis()
}
