//! Interactive XY positioning console against simulated axes.
//!
//! Demonstration frontend for the motion-coordination core. Subcommands:
//! - `run`: interactive console with a stdin command REPL
//! - `sets`: list position sets under the storage root
//! - `show`: print one set's rows
//!
//! The `run` REPL drives the same `UiRequest` channel a graphical frontend
//! would, and `key <name>` injects key presses into the jog listener to
//! exercise the out-of-band path.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::debug;

use manipulator::{
    ActuatorBinding, AxisError, AxisMotor, ConfirmationPrompt, Console, ConsoleConfig, Direction,
    KeySource, KeyboardJogListener, LivePositionSample, NamedPosition, PositionSet, PositionStore,
    UiRequest, VisualizationSink,
};

/// XY manipulator console
#[derive(Parser, Debug)]
#[command(name = "console")]
#[command(about = "Interactive two-axis positioning console (simulated axes)")]
#[command(version)]
struct Args {
    /// Storage root for position-set files (default: ~/.manipulator/positions)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// JSON config file to load instead of defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the interactive console
    Run {
        /// Refresh period override in milliseconds
        #[arg(long)]
        period_ms: Option<u64>,

        /// Jog step override
        #[arg(long)]
        step: Option<f64>,

        /// How the confirmation prompt answers (the REPL owns stdin)
        #[arg(long, value_enum, default_value_t = ConfirmMode::Yes)]
        confirm: ConfirmMode,
    },

    /// List position sets under the storage root
    Sets,

    /// Print one position set
    Show {
        /// Set name (file stem)
        name: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ConfirmMode {
    Yes,
    No,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    match args.command {
        Command::Run {
            period_ms,
            step,
            confirm,
        } => cmd_run(config, period_ms, step, confirm),
        Command::Sets => cmd_sets(config),
        Command::Show { name } => cmd_show(config, &name),
    }
}

fn resolve_config(args: &Args) -> Result<ConsoleConfig> {
    let mut config = match &args.config {
        Some(path) => ConsoleConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ConsoleConfig::default(),
    };
    if let Some(root) = &args.root {
        config.storage_root = root.clone();
    }
    Ok(config)
}

// ==================== Simulated hardware ====================

/// Instant-settling simulated axis.
struct SimAxis {
    label: &'static str,
    position: f64,
}

impl SimAxis {
    fn new(label: &'static str, position: f64) -> Self {
        Self { label, position }
    }
}

impl AxisMotor for SimAxis {
    fn current_position(&mut self) -> Result<f64, AxisError> {
        Ok(self.position)
    }

    fn move_relative(&mut self, delta: f64) -> Result<(), AxisError> {
        self.position += delta;
        debug!("sim axis {} -> {}", self.label, self.position);
        Ok(())
    }

    fn move_absolute(&mut self, target: f64) -> Result<(), AxisError> {
        self.position = target;
        debug!("sim axis {} -> {}", self.label, self.position);
        Ok(())
    }
}

/// Key source fed by the REPL's `key <name>` command.
struct InjectedKeys(Receiver<String>);

impl KeySource for InjectedKeys {
    fn poll_key(&mut self, timeout: Duration) -> Option<String> {
        self.0.recv_timeout(timeout).ok()
    }
}

// ==================== Terminal frontend ====================

/// Prompt that answers for the operator (the REPL owns stdin).
struct FixedAnswerPrompt {
    accept: bool,
}

impl ConfirmationPrompt for FixedAnswerPrompt {
    fn confirm(&mut self, title: &str, message: &str) -> bool {
        let answer = if self.accept { "yes" } else { "no" };
        println!("\n{title}: {message} -> {answer}");
        self.accept
    }
}

/// Sink printing the live position in place and the table on change.
struct TerminalSink;

impl VisualizationSink for TerminalSink {
    fn position_sample(&mut self, sample: LivePositionSample) {
        print!("\rposition ({:10.3}, {:10.3})  ", sample.x, sample.y);
        let _ = io::stdout().flush();
    }

    fn position_set(&mut self, set: &PositionSet) {
        println!("\n=== {} ({} rows) ===", set.name(), set.len());
        for (row, position) in set.iter().enumerate() {
            println!("{row:>3}  {:<20} {:>10.3} {:>10.3}", position.name, position.x, position.y);
        }
    }

    fn notify(&mut self, message: &str) {
        println!("\n! {message}");
    }
}

// ==================== Run Command ====================

fn cmd_run(
    mut config: ConsoleConfig,
    period_ms: Option<u64>,
    step: Option<f64>,
    confirm: ConfirmMode,
) -> Result<()> {
    if let Some(period_ms) = period_ms {
        config.refresh_period_ms = period_ms;
    }
    if let Some(step) = step {
        config.jog_step = step;
    }

    let binding = ActuatorBinding::from_axes(vec![
        Box::new(SimAxis::new("X", 0.0)),
        Box::new(SimAxis::new("Y", 0.0)),
    ]);

    let (key_tx, key_rx) = unbounded();
    let keyboard = KeyboardJogListener::new(Box::new(InjectedKeys(key_rx)));

    let mut console = Console::new(config, binding, keyboard)?;
    let (ui_tx, ui_rx) = bounded(16);

    println!("XY console on simulated axes. Type 'help' for commands.");
    std::thread::spawn(move || repl(ui_tx, key_tx));

    let mut sink = TerminalSink;
    let mut prompt = FixedAnswerPrompt {
        accept: matches!(confirm, ConfirmMode::Yes),
    };
    console.run(ui_rx, &mut sink, &mut prompt);

    println!("\nBye!");
    Ok(())
}

/// Read stdin commands and translate them into console requests.
fn repl(ui: Sender<UiRequest>, keys: Sender<String>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }
        match parse_command(line) {
            Ok(Some(ReplCommand::Request(request))) => {
                if ui.send(request).is_err() {
                    break;
                }
            }
            Ok(Some(ReplCommand::InjectKey(name))) => {
                let _ = keys.send(name);
            }
            Ok(None) => print_help(),
            Err(message) => println!("! {message}"),
        }
    }
    let _ = ui.send(UiRequest::Shutdown);
}

enum ReplCommand {
    Request(UiRequest),
    InjectKey(String),
}

fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let rest: Vec<&str> = words.collect();

    let request = match verb {
        "help" => return Ok(None),
        "jog" => {
            let [direction] = rest[..] else {
                return Err("usage: jog <up|down|left|right>".to_string());
            };
            let direction = Direction::from_str(direction)
                .map_err(|_| format!("unknown direction '{direction}'"))?;
            UiRequest::Jog(direction)
        }
        "goto" => match rest[..] {
            [x, y] => UiRequest::MoveToPoint {
                x: parse_number(x)?,
                y: parse_number(y)?,
                label: "target".to_string(),
            },
            [x, y, label] => UiRequest::MoveToPoint {
                x: parse_number(x)?,
                y: parse_number(y)?,
                label: label.to_string(),
            },
            _ => return Err("usage: goto <x> <y> [label]".to_string()),
        },
        "move" => {
            let [target] = rest[..] else {
                return Err("usage: move <row|name>".to_string());
            };
            match target.parse::<usize>() {
                Ok(row) => UiRequest::MoveToRow(row),
                Err(_) => UiRequest::MoveToName(target.to_string()),
            }
        }
        "entry" => {
            let [x, y] = rest[..] else {
                return Err("usage: entry <x> <y>".to_string());
            };
            UiRequest::ManualEntry {
                x: parse_number(x)?,
                y: parse_number(y)?,
            }
        }
        "add" => {
            let [name, x, y] = rest[..] else {
                return Err("usage: add <name> <x> <y>".to_string());
            };
            UiRequest::Insert(NamedPosition::new(name, parse_number(x)?, parse_number(y)?))
        }
        "rm" => {
            let [row] = rest[..] else {
                return Err("usage: rm <row>".to_string());
            };
            let row = row.parse().map_err(|_| format!("bad row '{row}'"))?;
            UiRequest::Remove(row)
        }
        "capture" => {
            let [name] = rest[..] else {
                return Err("usage: capture <name>".to_string());
            };
            UiRequest::CaptureCurrent {
                name: name.to_string(),
            }
        }
        "set" => {
            let [name] = rest[..] else {
                return Err("usage: set <name>".to_string());
            };
            UiRequest::SelectSet(name.to_string())
        }
        "step" => {
            let [step] = rest[..] else {
                return Err("usage: step <value>".to_string());
            };
            UiRequest::SetJogStep(parse_number(step)?)
        }
        "period" => {
            let [millis] = rest[..] else {
                return Err("usage: period <ms>".to_string());
            };
            let millis: u64 = millis.parse().map_err(|_| format!("bad period '{millis}'"))?;
            UiRequest::SetRefreshPeriod(Duration::from_millis(millis))
        }
        "kb" => match rest[..] {
            ["on"] => UiRequest::SetKeyboardEnabled(true),
            ["off"] => UiRequest::SetKeyboardEnabled(false),
            _ => return Err("usage: kb <on|off>".to_string()),
        },
        "key" => {
            let [name] = rest[..] else {
                return Err("usage: key <name>".to_string());
            };
            return Ok(Some(ReplCommand::InjectKey(name.to_string())));
        }
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };

    Ok(Some(ReplCommand::Request(request)))
}

fn parse_number(word: &str) -> Result<f64, String> {
    word.parse()
        .map_err(|_| format!("'{word}' is not a number"))
}

fn print_help() {
    println!("Commands:");
    println!("  jog <up|down|left|right>   jog by the current step");
    println!("  goto <x> <y> [label]       confirmed absolute move");
    println!("  move <row|name>            confirmed move to a saved position");
    println!("  entry <x> <y>              absolute move, no confirmation");
    println!("  add <name> <x> <y>         add a position and save");
    println!("  rm <row>                   remove a position and save");
    println!("  capture <name>             save the current position");
    println!("  set <name>                 switch the active set");
    println!("  step <value>               set the jog step");
    println!("  period <ms>                set the refresh period");
    println!("  kb <on|off>                toggle the keyboard jog listener");
    println!("  key <name>                 inject a key press (e.g. 'key droite')");
    println!("  quit                       exit");
}

// ==================== Sets / Show Commands ====================

fn cmd_sets(config: ConsoleConfig) -> Result<()> {
    let store = PositionStore::open(&config.storage_root)?;
    for name in store.list_sets()? {
        println!("{name}");
    }
    Ok(())
}

fn cmd_show(config: ConsoleConfig, name: &str) -> Result<()> {
    let mut store = PositionStore::open(&config.storage_root)?;
    if !store.list_sets()?.iter().any(|s| s == name) {
        bail!("position set '{name}' not found");
    }
    store.load_set(name)?;

    println!("Name,X,Y");
    for position in store.active().iter() {
        println!("{},{},{}", position.name, position.x, position.y);
    }
    Ok(())
}
