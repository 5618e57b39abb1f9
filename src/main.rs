// sketchsim: Arduino sketch simulator with a virtual digital I/O board

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sketchsim::board::PIN_COUNT;
use sketchsim::interpreter::{
    Host, HostSignal, Interpreter, SimConfig, SketchError, SystemHost, VirtualHost,
};
use sketchsim::ui::App;

/// How the sketch is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Interactive terminal UI
    Tui,
    /// Real time without a UI, for the given duration
    Headless(u64),
    /// Virtual time as fast as possible, printing every pin write
    DryRun(u64),
}

#[derive(Debug)]
struct Options {
    path: PathBuf,
    mode: Mode,
    config: SimConfig,
    /// Pins whose button is held for the whole run (non-TUI modes)
    pressed: Vec<u8>,
}

fn usage(program_name: &str) {
    eprintln!(
        "Usage: {program_name} <sketch.ino> [--headless <ms> | --dry-run <ms>] [--throttle <ms>] [--max-delay <ms>] [--press <pin>]..."
    );
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {program_name} blink.ino                    # Watch the sketch in the TUI");
    eprintln!("  {program_name} blink.ino --dry-run 5000     # Print the writes of 5 virtual seconds");
    eprintln!("  {program_name} button.ino --headless 2000 --press 2");
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("{flag} needs a value"))?;
    value
        .parse()
        .map_err(|_| format!("{flag}: invalid number '{value}'"))
}

fn parse_args(args: Vec<String>) -> Result<Options, String> {
    let mut args = args.into_iter().skip(1);
    let mut path = None;
    let mut mode = Mode::Tui;
    let mut config = SimConfig::default();
    let mut pressed = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--headless" => mode = Mode::Headless(parse_number(&arg, args.next())?),
            "--dry-run" => mode = Mode::DryRun(parse_number(&arg, args.next())?),
            "--throttle" => {
                config = config.with_loop_throttle_ms(parse_number(&arg, args.next())?)
            }
            "--max-delay" => config = config.with_max_delay_ms(parse_number(&arg, args.next())?),
            "--press" => {
                let pin: u8 = parse_number(&arg, args.next())?;
                if pin as usize >= PIN_COUNT {
                    return Err(format!("--press: pin {pin} is not on the board"));
                }
                pressed.push(pin);
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown option {flag}")),
            _ if path.is_none() => path = Some(PathBuf::from(&arg)),
            _ => return Err(format!("Unexpected argument '{arg}'")),
        }
    }

    let path = path.ok_or_else(|| String::from("No input file provided"))?;
    Ok(Options {
        path,
        mode,
        config,
        pressed,
    })
}

fn read_sketch(path: &Path) -> Result<String, SketchError> {
    fs::read_to_string(path).map_err(|source| SketchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn init_tracing() {
    // Respects RUST_LOG; defaults to info so pin writes and lifecycle events show
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Hold the given pins HIGH for the whole session
fn press_pins<H: Host>(interpreter: &mut Interpreter<H>, pressed: &[u8]) {
    if pressed.is_empty() {
        return;
    }
    let mask = pressed.iter().fold(0u32, |mask, &pin| mask | (1 << pin));
    interpreter
        .board_mut()
        .set_input_source(Box::new(move |pin| ((mask >> pin) & 1) as u8));
}

fn run_headless(source: String, options: &Options, limit_ms: u64) -> Result<(), SketchError> {
    let host = SystemHost::new().with_time_limit(limit_ms);
    let mut interpreter = Interpreter::with_config(host, options.config);
    press_pins(&mut interpreter, &options.pressed);
    interpreter.set_code(source);
    interpreter.start()?;

    while interpreter.is_running() {
        if interpreter.host().expired() {
            interpreter.stop();
            break;
        }
        interpreter.tick();

        let now = interpreter.host().now_ms();
        let wake = interpreter.next_deadline().unwrap_or(limit_ms).min(limit_ms);
        if wake > now {
            thread::sleep(Duration::from_millis(wake - now));
        }
    }

    tracing::info!(
        writes = interpreter.host().writes(),
        elapsed_ms = interpreter.host().now_ms(),
        sketch_finished = interpreter.host().is_finished(),
        "headless run finished"
    );
    Ok(())
}

fn run_dry(source: String, options: &Options, limit_ms: u64) -> Result<(), SketchError> {
    let mut interpreter = Interpreter::with_config(VirtualHost::new(), options.config);
    interpreter.host_mut().signal_at(limit_ms, HostSignal::Stop);
    press_pins(&mut interpreter, &options.pressed);
    interpreter.set_code(source);
    interpreter.start()?;

    while interpreter.is_running() {
        interpreter.tick();
        let now = interpreter.host().now_ms();
        match interpreter.next_deadline() {
            Some(_) if now >= limit_ms => {
                interpreter.stop();
                break;
            }
            Some(deadline) => interpreter
                .host_mut()
                .advance(deadline.saturating_sub(now).min(limit_ms - now)),
            None => break,
        }
    }

    for write in interpreter.host().writes() {
        println!(
            "{:>8} ms  D{:<2} <- {} ({})",
            write.at_ms,
            write.pin,
            write.value,
            write.level()
        );
    }
    println!("{} write(s) in {} ms", interpreter.host().writes().len(), interpreter.host().now_ms());
    Ok(())
}

fn run_tui(source: String, options: &Options) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;

    let mut app = App::new(terminal, source, options.config);
    let res = app.run();

    // Restore terminal
    disable_raw_mode()?;
    execute!(app.terminal_mut().backend_mut(), LeaveAlternateScreen)?;
    app.terminal_mut().show_cursor()?;

    res
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let program_name = args
        .first()
        .map(|s| s.as_str())
        .unwrap_or("sketchsim")
        .to_string();

    let options = match parse_args(args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            usage(&program_name);
            std::process::exit(1);
        }
    };

    let source = read_sketch(&options.path)?;

    match options.mode {
        Mode::Tui => run_tui(source, &options)?,
        Mode::Headless(ms) => {
            init_tracing();
            run_headless(source, &options, ms)?
        }
        Mode::DryRun(ms) => {
            init_tracing();
            run_dry(source, &options, ms)?
        }
    }

    Ok(())
}
