//! Headless Anomaly Simulation
//!
//! Runs the scheduler over a world for a fixed span of game time, with an
//! optional simulated player filing reports, and writes the event stream.

use std::path::PathBuf;
use std::process::ExitCode;

use anomaly_core::{EventLogger, RecordingSignals, Scheduler, WorldConfig};
use anomaly_events::{ResolveCause, SchedulerEventKind};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "anomaly_sim")]
#[command(about = "Headless run of the anomaly scheduler")]
struct Args {
    /// World TOML file; the built-in house is used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed, overriding the one in the config
    #[arg(long)]
    seed: Option<u64>,

    /// Game seconds to simulate
    #[arg(long, default_value_t = 480.0)]
    seconds: f64,

    /// Tick length in seconds
    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    /// Seconds between simulated player reports (0 = never report)
    #[arg(long, default_value_t = 15.0)]
    report_every: f64,

    /// JSONL file receiving the scheduler event stream
    #[arg(long)]
    events_out: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Summary {
    spawns: u64,
    forced_spawns: u64,
    aborts: u64,
    reported: u64,
    timed_out: u64,
    forced: u64,
    reports_landed: u64,
    reports_missed: u64,
}

impl Summary {
    fn observe(&mut self, kind: &SchedulerEventKind) {
        match kind {
            SchedulerEventKind::Spawned { forced, .. } => {
                self.spawns += 1;
                if *forced {
                    self.forced_spawns += 1;
                }
            }
            SchedulerEventKind::InitAborted { .. } => self.aborts += 1,
            SchedulerEventKind::Resolved { cause, .. } => match cause {
                ResolveCause::Reported => self.reported += 1,
                ResolveCause::Timeout => self.timed_out += 1,
                ResolveCause::Forced => self.forced += 1,
            },
            _ => {}
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if !(args.dt.is_finite() && args.dt > 0.0) {
        return Err("--dt must be a positive number".into());
    }

    let mut world = match &args.config {
        Some(path) => WorldConfig::from_file(path)?,
        None => WorldConfig::default_world()?,
    };
    if args.seed.is_some() {
        world.scheduler.seed = args.seed;
    }
    let seed = world.scheduler.seed;

    println!("Anomaly Scheduler Simulation");
    println!("============================");
    match seed {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: entropy"),
    }
    println!("Game seconds: {}", args.seconds);
    println!("Tick: {}s", args.dt);
    println!();

    let mut scheduler = Scheduler::from_world(world, RecordingSignals::new())?;
    let mut logger = match &args.events_out {
        Some(path) => EventLogger::new(path)?,
        None => EventLogger::null(),
    };

    // The simulated player draws from its own stream so reports never shift
    // the scheduler's picks
    let mut player_rng = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(1)),
        None => SmallRng::from_entropy(),
    };

    let mut summary = Summary::default();
    let mut next_report_at = args.report_every;

    while scheduler.clock() < args.seconds {
        scheduler.tick(args.dt);

        if args.report_every > 0.0 && scheduler.clock() >= next_report_at {
            next_report_at += args.report_every;
            let room_id = scheduler
                .rooms()
                .iter()
                .map(|room| room.id().to_string())
                .choose(&mut player_rng);
            if let Some(room_id) = room_id {
                if scheduler.check_report(&room_id, None, None) {
                    summary.reports_landed += 1;
                } else {
                    summary.reports_missed += 1;
                }
            }
        }

        let events = scheduler.drain_events();
        for event in &events {
            summary.observe(&event.kind);
        }
        logger.log_batch(&events)?;
    }

    scheduler.shutdown();
    let events = scheduler.drain_events();
    for event in &events {
        summary.observe(&event.kind);
    }
    logger.log_batch(&events)?;
    logger.flush()?;

    let signals = scheduler.signals();
    println!("Simulation complete");
    println!("  Clock: {:.1}s", scheduler.clock());
    println!("  Spawned: {} ({} forced)", summary.spawns, summary.forced_spawns);
    println!("  Aborted during setup: {}", summary.aborts);
    println!(
        "  Resolved: {} reported, {} timed out, {} forced",
        summary.reported, summary.timed_out, summary.forced
    );
    println!(
        "  Reports: {} landed, {} missed",
        summary.reports_landed, summary.reports_missed
    );
    println!("  Peak aggression: {}", signals.peak_level);
    println!("  Won: {}", if signals.wins > 0 { "yes" } else { "no" });
    if let Some(path) = &args.events_out {
        println!("  Events: {} written to {}", logger.event_count(), path.display());
    }

    Ok(())
}
