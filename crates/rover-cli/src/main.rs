//! `rover-cli` – sensor bench console.
//!
//! This binary wires the perception stack to a simulated board so that a
//! calibration table can be exercised without the robot. It:
//!
//! 1. Checks for `~/.rover/config.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Initialises the [`SensorSuite`] with the loaded calibration.
//! 3. Drops the user into an **interactive REPL** for scripting raw sensor
//!    values and reading the classifications.
//! 4. Intercepts **Ctrl-C** to stop a running `/watch` and exit cleanly.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, warn};

use rover_hal::sim::SimBoard;
use rover_perception::{SensorPins, SensorSuite};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set ROVER_LOG_FORMAT=json to emit newline-delimited JSON logs.
    // The console's user-facing output still uses println!.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("ROVER_LOG_FORMAT").as_deref() == Ok("json") {
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

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(
            error = %e,
            "Failed to install Ctrl-C handler; /watch can only be stopped by its tick count"
        );
    }

    // ── First-Run Wizard ──────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Sensor bring-up ───────────────────────────────────────────────────
    let board = SimBoard::new();
    // Start from a plausible idle scene: both IR sensors over light field,
    // nothing in front of the ranger, no colour target under the sensor.
    let idle_ir = cfg.calibration.line.white_min;
    board.set_analog(&cfg.pins.ir_left, idle_ir);
    board.set_analog(&cfg.pins.ir_right, idle_ir);
    board.set_echo_us(None);
    board.set_color_sample(None);

    let pins = SensorPins::simulated(&board, &cfg.pins);
    let suite = match SensorSuite::initialize_sensors(pins, cfg.calibration.clone()) {
        Ok(suite) => suite,
        Err(e) => {
            error!(error = %e, "sensor initialisation failed");
            println!("{}: {}", "Sensor initialisation failed".red(), e);
            std::process::exit(1);
        }
    };
    println!("  {} Sensors initialised on simulated board.", "✓".green().bold());

    println!();
    println!(
        "  Type {} for a list of commands.\n",
        "/help".bold().cyan()
    );

    // ── Interactive REPL ──────────────────────────────────────────────────
    let mut bench = repl::Bench {
        suite,
        board,
        pins: cfg.pins,
        watch_interval: Duration::from_millis(cfg.watch_interval_ms),
    };
    repl::run(&mut bench, shutdown);
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║        Rover First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's record the basic thresholds.\n");

    let mut cfg = config::Config::default();

    let obstacle = prompt_line(
        &format!(
            "  Obstacle distance in cm [{}]: ",
            cfg.calibration.range.obstacle_distance_cm
        ),
        &cfg.calibration.range.obstacle_distance_cm.to_string(),
    );
    if let Ok(cm) = obstacle.trim().parse::<f32>() {
        cfg.calibration.range.obstacle_distance_cm = cm;
    }

    let threshold = prompt_line(
        &format!("  IR line threshold (ADC counts) [{}]: ", cfg.calibration.line.threshold),
        &cfg.calibration.line.threshold.to_string(),
    );
    if let Ok(t) = threshold.trim().parse::<u16>() {
        cfg.calibration.line.threshold = t;
    }

    if let Err(e) = cfg.calibration.validate() {
        println!("{}: {}", "Invalid value".red(), e);
        println!("  Keeping the default calibration.");
        cfg.calibration = config::Config::default().calibration;
    }

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ___                      "#.bold().cyan());
    println!("{}", r#"  / _ \___ _  _____ ____    "#.bold().cyan());
    println!("{}", r#" / , _/ _ \ |/ / -_) __/    "#.bold().cyan());
    println!("{}", r#"/_/|_|\___/___/\__/_/       "#.bold().cyan());
    println!();
    println!("  {} {}",
        "Rover".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Sensor Bench Console");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
