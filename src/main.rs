//! Headless scenario runner
//!
//! Loads content, spawns entities from archetypes, runs a fixed number of
//! ticks and prints a summary. Optionally writes the final snapshot as JSON.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use sim_kernel::core::error::Result;
use sim_kernel::{ContentPack, KernelConfig, Signal, SignalKind, World};

/// Run a content pack headless for a number of ticks
#[derive(Parser, Debug)]
#[command(name = "sim-kernel")]
#[command(about = "Run simulation content headless and report the outcome")]
struct Args {
    /// Content files (TOML or JSON), loaded in order
    #[arg(long, required = true)]
    content: Vec<PathBuf>,

    /// Kernel configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Archetype to spawn one entity of; repeat for more
    #[arg(long)]
    spawn: Vec<String>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 100)]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 0.1)]
    dt: f64,

    /// Write the final world snapshot here
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct RunSummary {
    ticks: u64,
    seconds: f64,
    entities: usize,
    active_timers: usize,
    active_events: usize,
    unlocked: Vec<String>,
    notifications: Vec<String>,
    rejected_content: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sim_kernel=info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => KernelConfig::from_file(path)?,
        None => KernelConfig::default(),
    };
    let mut world = World::new(config);

    let mut pack = ContentPack::default();
    for path in &args.content {
        pack.merge(ContentPack::from_file(path)?);
    }
    let report = world.load_content(pack);

    let notifications = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&notifications);
    world.subscribe(SignalKind::Notification, move |signal: &Signal, _world: &mut World| {
        if let Signal::Notification { message, .. } = signal {
            sink.borrow_mut().push(message.clone());
        }
    });

    for archetype in &args.spawn {
        let id = world.spawn_entity(Some(archetype.as_str()))?;
        tracing::info!("spawned {} as {}", archetype, id);
    }

    for _ in 0..args.ticks {
        world.tick(args.dt);
    }

    if let Some(path) = &args.snapshot {
        world.create_snapshot().save(path)?;
        tracing::info!("snapshot written to {}", path.display());
    }

    let summary = RunSummary {
        ticks: world.tick_count(),
        seconds: world.now().as_secs(),
        entities: world.entities().len(),
        active_timers: world.timers().active_count(),
        active_events: world.events().active_instances().count(),
        unlocked: world
            .progression()
            .unlocked()
            .into_iter()
            .map(|k| k.to_string())
            .collect(),
        notifications: notifications.borrow().clone(),
        rejected_content: report.rejected,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("=== RUN COMPLETE ===");
        println!("Ticks:          {}", summary.ticks);
        println!("Simulated time: {:.2}s", summary.seconds);
        println!("Entities:       {}", summary.entities);
        println!("Active timers:  {}", summary.active_timers);
        println!("Active events:  {}", summary.active_events);
        println!("Unlocked:       {:?}", summary.unlocked);
        println!("Notifications:  {}", summary.notifications.len());
        for message in &summary.notifications {
            println!("  - {}", message);
        }
        for rejected in &summary.rejected_content {
            println!("Rejected: {}", rejected);
        }
    }
    Ok(())
}
