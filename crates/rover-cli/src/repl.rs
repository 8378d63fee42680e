//! REPL – Read-Eval-Print Loop for the sensor bench console.
//!
//! Supported slash-commands:
//!   /help                 – show this list
//!   /read                 – read every sensor once
//!   /json                 – read every sensor once, print as JSON
//!   /distance             – ultrasonic distance and obstacle/ramp flags
//!   /line                 – line offset from the reflectance pair
//!   /color                – colour class from the filtered-light sensor
//!   /watch [ticks]        – stream readings until Ctrl-C (or `ticks` reads)
//!   /sim echo <us>|none   – script the ultrasonic echo width
//!   /sim ir <left> <right>  – script the reflectance counts
//!   /sim rgb <r> <g> <b>|none – script the colour pulse widths
//!   /sim fault <pin> | /sim clear <pin> – fail or restore a pin
//!   /calibration          – print the active calibration as TOML
//!   /quit | /exit         – exit the console

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rover_hal::sim::SimBoard;
use rover_perception::{PinMap, SensorSnapshot, SensorSuite};
use rover_types::{ColorCategory, ColorSample, LineOffset};

/// Everything the console drives: the suite under test and the simulated
/// board it is wired to.
pub struct Bench {
    pub suite: SensorSuite,
    pub board: SimBoard,
    pub pins: PinMap,
    pub watch_interval: Duration,
}

/// A parsed `/sim` sub-command.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    Echo(Option<u32>),
    Ir { left: u16, right: u16 },
    Rgb(Option<ColorSample>),
    Fault(String),
    Clear(String),
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(bench: &mut Bench, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "rover>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();

        match cmd {
            "/help" => cmd_help(),
            "/read" => println!("{}", format_snapshot(&bench.suite.snapshot())),
            "/json" => cmd_json(bench),
            "/distance" => cmd_distance(bench),
            "/line" => {
                let offset = bench.suite.resolve_line_position();
                println!("  line: {}", paint_offset(offset));
            }
            "/color" => {
                let color = bench.suite.classify_color();
                println!("  color: {}", paint_color(color));
            }
            "/watch" => cmd_watch(bench, &args, &shutdown),
            "/sim" => match parse_sim(&args) {
                Ok(sim) => apply_sim(bench, sim),
                Err(e) => println!("{} {}", "Usage:".red(), e),
            },
            "/calibration" => cmd_calibration(bench),
            "/quit" | "/exit" => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            other => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Rover Bench Commands".bold().underline());
    println!("  {}               – read every sensor once", "/read".bold().cyan());
    println!("  {}               – same, as JSON", "/json".bold().cyan());
    println!("  {}           – distance, obstacle and ramp", "/distance".bold().cyan());
    println!("  {}               – line offset", "/line".bold().cyan());
    println!("  {}              – colour class", "/color".bold().cyan());
    println!("  {}      – stream readings until Ctrl-C", "/watch [ticks]".bold().cyan());
    println!("  {}   – script echo width", "/sim echo <us>|none".bold().cyan());
    println!("  {} – script reflectance", "/sim ir <left> <right>".bold().cyan());
    println!("  {} – script colour widths", "/sim rgb <r> <g> <b>|none".bold().cyan());
    println!("  {} – fail / restore a pin", "/sim fault|clear <pin>".bold().cyan());
    println!("  {}        – print calibration", "/calibration".bold().cyan());
    println!("  {}        – exit the console", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_json(bench: &mut Bench) {
    match serde_json::to_string_pretty(&bench.suite.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("{}: {}", "Serialization error".red(), e),
    }
}

fn cmd_distance(bench: &mut Bench) {
    let distance = bench.suite.measure_distance();
    let max = bench.suite.calibration().range.max_distance_cm;
    let obstacle = bench.suite.detect_obstacle();
    let ramp = bench.suite.detect_ramp();
    let shown = if distance >= max {
        format!("{distance:.1} cm (nothing in range)").dimmed().to_string()
    } else {
        format!("{distance:.1} cm").bold().to_string()
    };
    println!("  distance: {shown}");
    println!("  obstacle: {}", flag(obstacle));
    println!("  ramp:     {}", flag(ramp));
}

fn cmd_watch(bench: &mut Bench, args: &[&str], shutdown: &AtomicBool) {
    let ticks = match args.first().map(|a| a.parse::<u64>()) {
        None => None,
        Some(Ok(n)) => Some(n),
        Some(Err(_)) => {
            println!("{} /watch [ticks]", "Usage:".red());
            return;
        }
    };
    println!(
        "  Watching every {} ms. Press {} to stop.",
        bench.watch_interval.as_millis(),
        "Ctrl-C".bold()
    );

    let mut tick = 0u64;
    while !shutdown.load(Ordering::SeqCst) && ticks.is_none_or(|n| tick < n) {
        println!("{}", format_snapshot(&bench.suite.snapshot()));
        tick += 1;
        std::thread::sleep(bench.watch_interval);
    }
}

fn cmd_calibration(bench: &Bench) {
    match toml::to_string_pretty(bench.suite.calibration()) {
        Ok(raw) => println!("{raw}"),
        Err(e) => println!("{}: {}", "Serialization error".red(), e),
    }
}

fn apply_sim(bench: &mut Bench, sim: SimCommand) {
    match sim {
        SimCommand::Echo(width) => bench.board.set_echo_us(width),
        SimCommand::Ir { left, right } => {
            bench.board.set_analog(&bench.pins.ir_left, left);
            bench.board.set_analog(&bench.pins.ir_right, right);
        }
        SimCommand::Rgb(sample) => bench.board.set_color_sample(sample),
        SimCommand::Fault(pin) => bench.board.inject_fault(&pin),
        SimCommand::Clear(pin) => bench.board.clear_fault(&pin),
    }
    println!("  {}", "✓ updated".green());
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing and formatting
// ─────────────────────────────────────────────────────────────────────────────

/// Parse the arguments following `/sim`.
pub fn parse_sim(args: &[&str]) -> Result<SimCommand, String> {
    fn num<T: std::str::FromStr>(s: &str) -> Result<T, String> {
        s.parse::<T>().map_err(|_| format!("'{s}' is not a valid number"))
    }

    match args {
        ["echo", "none"] => Ok(SimCommand::Echo(None)),
        ["echo", us] => Ok(SimCommand::Echo(Some(num(us)?))),
        ["ir", left, right] => Ok(SimCommand::Ir {
            left: num(left)?,
            right: num(right)?,
        }),
        ["rgb", "none"] => Ok(SimCommand::Rgb(None)),
        ["rgb", r, g, b] => Ok(SimCommand::Rgb(Some(ColorSample::new(num(r)?, num(g)?, num(b)?)))),
        ["fault", pin] => Ok(SimCommand::Fault((*pin).to_string())),
        ["clear", pin] => Ok(SimCommand::Clear((*pin).to_string())),
        _ => Err(
            "/sim echo <us>|none | ir <left> <right> | rgb <r> <g> <b>|none | fault|clear <pin>"
                .to_string(),
        ),
    }
}

/// One-line, uncoloured summary of a snapshot.
pub fn format_snapshot(snap: &SensorSnapshot) -> String {
    let dist = match snap.range {
        Some(_) => format!("{:>6.1} cm", snap.distance_cm),
        None => " fault".to_string(),
    };
    let ir = match snap.ir {
        Some([l, r]) => format!("{l}/{r}"),
        None => "fault".to_string(),
    };
    let rgb = match snap.sample {
        Some(s) => format!("{}/{}/{}", s.red, s.green, s.blue),
        None => "-".to_string(),
    };
    format!(
        "[{}] dist {}{}{} | ir {} -> {} | rgb {} -> {}",
        snap.taken_at.format("%H:%M:%S%.3f"),
        dist,
        if snap.obstacle { " OBSTACLE" } else { "" },
        if snap.ramp { " RAMP" } else { "" },
        ir,
        snap.line,
        rgb,
        snap.color,
    )
}

fn flag(value: bool) -> colored::ColoredString {
    if value { "yes".yellow().bold() } else { "no".dimmed() }
}

fn paint_offset(offset: LineOffset) -> colored::ColoredString {
    match offset {
        LineOffset::Center => offset.to_string().green(),
        LineOffset::Left | LineOffset::Right => offset.to_string().yellow(),
    }
}

fn paint_color(color: ColorCategory) -> colored::ColoredString {
    let name = color.to_string();
    match color {
        ColorCategory::Black => name.bold(),
        ColorCategory::Green => name.green(),
        ColorCategory::Red => name.red(),
        ColorCategory::Blue => name.blue(),
        ColorCategory::White => name.white().bold(),
        ColorCategory::Unknown => name.dimmed(),
    }
}
