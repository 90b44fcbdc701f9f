//! minitel - Command-line tool for a Minitel on a serial port
//!
//! # Quick Start
//!
//! ```text
//! minitel ports                   # List serial ports
//! minitel probe                   # Detect speed and identify the terminal
//! minitel monitor                 # Dump keys typed on the Minitel
//! minitel send "3615 CODE"        # Display text
//! minitel config --save           # Write the current settings to config.toml
//! minitel -d /dev/ttyUSB1 probe   # Use another device
//! ```
//!
//! Settings are read from `~/.minitel/config.toml`, logs go to
//! `~/.minitel/minitel.log`.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use minitel::config::{self, Config};
use minitel::core::constants::ESC;
use minitel::core::transport::available_ports;
use minitel::{Minitel, Sequence};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Poll interval of the monitor loop
const MONITOR_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, PartialEq)]
enum Command {
    Ports,
    Probe,
    Monitor,
    Send(String),
    /// Print the effective configuration, or write it with --save
    Config { save: bool },
}

/// Command-line options
#[derive(Debug, PartialEq)]
struct Options {
    /// Device given with -d, overrides config.toml
    device: Option<String>,
    command: Command,
}

fn print_version() {
    eprintln!("minitel {}", VERSION);
}

fn print_help() {
    eprintln!("minitel {} - Drive a Minitel over a serial link", VERSION);
    eprintln!();
    eprintln!("Usage: minitel [OPTIONS] <COMMAND>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  ports                 List serial ports");
    eprintln!("  probe                 Detect speed, identify and show capabilities");
    eprintln!("  monitor               Print frames sent by the Minitel (Esc to quit)");
    eprintln!("  send <TEXT>           Display text on the Minitel");
    eprintln!("  config [--save]       Show the effective configuration, or save it");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -d, --device <PATH>   Serial device (default from config.toml)");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.minitel/config.toml");
    eprintln!("Log file:      ~/.minitel/minitel.log (level override: MINITEL_LOG)");
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut device = None;
    let mut command = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-d" | "--device" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing device argument".to_string());
                }
                device = Some(args[i].clone());
            }
            "ports" if command.is_none() => command = Some(Command::Ports),
            "probe" if command.is_none() => command = Some(Command::Probe),
            "monitor" if command.is_none() => command = Some(Command::Monitor),
            "config" if command.is_none() => command = Some(Command::Config { save: false }),
            "--save" if matches!(command, Some(Command::Config { .. })) => {
                command = Some(Command::Config { save: true });
            }
            "send" if command.is_none() => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing text to send".to_string());
                }
                command = Some(Command::Send(args[i].clone()));
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    let command = command.ok_or_else(|| "No command given. Use -h for help.".to_string())?;
    Ok(Options { device, command })
}

/// Log to ~/.minitel/minitel.log; `MINITEL_LOG` overrides the configured level
fn init_logging(level: &str) {
    let log_path = config::data_dir()
        .map(|dir| dir.join("minitel.log"))
        .unwrap_or_else(|| PathBuf::from("minitel.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter =
            EnvFilter::try_from_env("MINITEL_LOG").unwrap_or_else(|_| EnvFilter::new(level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Bring the link to the configured state
fn prepare(minitel: &mut Minitel, config: &Config) -> anyhow::Result<()> {
    if config.link.detect_speed {
        match minitel.detect_speed()? {
            Some(bps) => info!("Minitel answers at {} bps", bps),
            None => bail!("No Minitel answering on {}", config.device),
        }
    }

    // The speed limit comes from the identified model
    if !minitel.identify()? {
        warn!("Identification failed, assuming a basic Minitel");
    }

    if let Some(bps) = config.link.target_speed {
        if !minitel.set_speed(bps)? {
            warn!("Minitel refused {} bps, staying at {}", bps, minitel.speed());
        }
    }

    let keyboard = config.keyboard_mode();
    if !keyboard.is_empty() && !minitel.configure_keyboard(keyboard)? {
        warn!("Keyboard configuration {:?} not acknowledged", keyboard);
    }

    if let Some(enabled) = config.display.echo {
        if !minitel.echo(enabled)? {
            warn!("Echo change not acknowledged");
        }
    }

    Ok(())
}

fn probe(minitel: &Minitel) -> anyhow::Result<()> {
    let caps = minitel.capabilities();
    println!("Speed:        {} bps", minitel.speed());
    println!("Mode:         {}", minitel.mode());
    println!("Model:        {}", caps.name);
    println!("Manufacturer: {}", caps.manufacturer);
    if let Some(version) = caps.version {
        println!("Version:      {}", version);
    }
    println!("Keyboard:     {:?}", caps.keyboard);
    println!("Max speed:    {} bps", caps.max_speed);
    println!("80 columns:   {}", yes_no(caps.columns_80));
    println!("Flippable:    {}", yes_no(caps.flippable));
    println!("Custom chars: {}", yes_no(caps.redefinable_chars));
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Hex dump of a frame, followed by the character when printable
fn format_frame(frame: &Sequence) -> String {
    let hex: Vec<String> = frame.iter().map(|b| format!("{:02X}", b)).collect();
    match frame.as_bytes() {
        &[b] if (0x20..0x7f).contains(&b) => format!("{:<12} {}", hex.join(" "), b as char),
        _ => hex.join(" "),
    }
}

/// Disables raw mode on drop
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Host key that ends the monitor: Esc or Ctrl+C
fn host_wants_quit() -> io::Result<bool> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let ctrl_c = key.code == KeyCode::Char('c')
                && key.modifiers.contains(KeyModifiers::CONTROL);
            if key.code == KeyCode::Esc || ctrl_c {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn monitor(minitel: &Minitel) -> anyhow::Result<()> {
    eprintln!("Monitoring, press Esc on the Minitel or the host to quit");

    let _raw = RawMode::enable().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();

    loop {
        let frame = minitel.receive_sequence(true, Some(MONITOR_POLL));
        if !frame.is_empty() {
            write!(stdout, "{}\r\n", format_frame(&frame))?;
            stdout.flush()?;
            if frame.equals([ESC]) {
                break;
            }
        }

        if host_wants_quit()? {
            break;
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let mut config = Config::load();
    if let Some(device) = options.device {
        config.device = device;
    }

    init_logging(&config.log_level);
    info!("minitel {} starting...", VERSION);

    match options.command {
        Command::Ports => {
            for port in available_ports() {
                println!("{}", port);
            }
            return Ok(());
        }
        Command::Config { save: false } => {
            print!("{}", config.to_toml()?);
            return Ok(());
        }
        Command::Config { save: true } => {
            let path = config.save().context("Failed to save configuration")?;
            info!("Configuration written to {}", path.display());
            eprintln!("Configuration written to {}", path.display());
            return Ok(());
        }
        _ => {}
    }

    let mut minitel = Minitel::open(&config.device)
        .with_context(|| format!("Cannot open Minitel on {}", config.device))?;

    let result = prepare(&mut minitel, &config).and_then(|()| match &options.command {
        Command::Probe => probe(&minitel),
        Command::Monitor => monitor(&minitel),
        Command::Send(text) => minitel.send(text).map_err(Into::into),
        Command::Ports | Command::Config { .. } => Ok(()),
    });

    // Flushes whatever is still queued
    minitel.close();
    info!("minitel exiting");
    result
}
