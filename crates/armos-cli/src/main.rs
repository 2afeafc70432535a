//! `armos` – manipulator command-and-control console.
//!
//! This binary is the ignition switch for the ARMOS stack.  It:
//!
//! 1. Initialises structured logging (`RUST_LOG`, `ARMOS_LOG_FORMAT=json`).
//! 2. Loads `~/.armos/config.toml`, writing defaults on first run.
//! 3. Wires the simulated planner, gripper, and perception feed to the
//!    motion stack: perception intake, command worker, status reporter.
//! 4. Reads operator commands from stdin (`GRAB=1`, `POINT=2`, `HOME`,
//!    `SCENE`, `DROP x y z`, `quit`), routing lines to the safety gate
//!    while a confirmation is pending.
//! 5. Intercepts Ctrl-C and shuts the stack down.

mod config;
mod console;
mod feed;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use tracing::{info, warn};

use armos_motion::{
    CommandArbitrator, CommandQueue, EventBus, MotionExecutor, SafetyGate, SceneSynchronizer,
    StateCell, StatusReporter, Topic, forward_commands, spawn_command_worker,
};
use armos_perception::PerceptionCache;
use armos_planner::{SimGripper, SimPlanner, shared_gripper, shared_planner};
use armos_types::{Event, EventPayload};

use crate::console::{ConsolePrompt, PendingAnswer};

#[tokio::main]
async fn main() {
    init_logging();
    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  No config found; wrote defaults to {}",
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => warn!(error = %e, "could not persist default config"),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {e}", "Config error".red());
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Shared infrastructure ─────────────────────────────────────────────
    let bus = EventBus::default();
    let cache = Arc::new(PerceptionCache::new());
    let state = StateCell::new();
    let shutdown = Arc::new(AtomicBool::new(false));

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    {
        let bus = bus.clone();
        let shutdown = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || {
            println!();
            println!("{}", "Ctrl-C received; shutting down.".yellow().bold());
            bus.publish_to(
                Topic::Commands,
                Event::now(
                    "armos-cli",
                    EventPayload::Halt {
                        reason: "operator Ctrl-C".to_string(),
                    },
                ),
            );
            shutdown.store(true, Ordering::Release);
        }) {
            warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    // ── Motion stack ──────────────────────────────────────────────────────
    // Simulated backends; the real planning-service and gripper bridges
    // plug in behind the same traits.
    let planner = shared_planner(SimPlanner::new());
    let gripper = shared_gripper(SimGripper::new());

    let pending = PendingAnswer::new();
    let gate = if cfg.require_confirmation {
        SafetyGate::new(true, Box::new(ConsolePrompt::new(pending.clone())))
    } else {
        println!(
            "  {}",
            "Safety confirmation disabled; plans execute unprompted.".yellow()
        );
        SafetyGate::auto_approve()
    };

    let settle = Duration::from_millis(cfg.settle_ms);
    let executor = MotionExecutor::new(
        Arc::clone(&planner),
        gripper,
        Arc::clone(&cache),
        gate,
        Arc::clone(&state),
        settle,
    );
    let scene = SceneSynchronizer::new(planner, Arc::clone(&cache), settle);
    let arbitrator = CommandArbitrator::new(Arc::clone(&state), executor, scene);

    let (queue, queue_rx) = CommandQueue::bounded(cfg.command_queue_depth);
    let _worker = spawn_command_worker(arbitrator, queue_rx);

    tokio::spawn(forward_commands(bus.clone(), queue, Arc::clone(&shutdown)));
    tokio::spawn(
        StatusReporter::new(
            Arc::clone(&state),
            bus.clone(),
            Duration::from_millis(cfg.status_period_ms),
        )
        .run(Arc::clone(&shutdown)),
    );
    tokio::spawn(feed::run_sim_feed(
        bus.clone(),
        Duration::from_millis(cfg.sim_feed_period_ms),
        Arc::clone(&shutdown),
    ));
    tokio::spawn(feed::run_perception_intake(
        bus.clone(),
        Arc::clone(&cache),
        Arc::clone(&shutdown),
    ));

    let _console = console::spawn_console(bus.clone(), pending, Arc::clone(&shutdown));

    println!();
    println!(
        "  Commands: {}  {}  {}  {}  {}  ({} to exit)",
        "GRAB=<id>".bold(),
        "POINT=<id>".bold(),
        "DROP x y z".bold(),
        "HOME".bold(),
        "SCENE".bold(),
        "quit".bold().cyan()
    );
    println!();
    info!("armos stack running");

    // ── Park until shutdown ───────────────────────────────────────────────
    while !shutdown.load(Ordering::Acquire) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    info!("shutting down");
    // A parked confirmation prompt has no timeout; do not let it hold the
    // process open once the operator has asked to leave.
    tokio::time::sleep(Duration::from_millis(200)).await;
    std::process::exit(0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Initialise tracing-subscriber from `RUST_LOG` (default "info").  Set
/// `ARMOS_LOG_FORMAT=json` for newline-delimited JSON logs suitable for
/// log aggregators.
fn init_logging() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("ARMOS_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║   ARMOS · manipulator control    ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════╝".bold().cyan());
    println!();
}
