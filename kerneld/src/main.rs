//! # Kernel Host Daemon
//!
//! Main entry point for replaying event scripts against the simulated kernel.

use core_types::{parse_size, SchedulingAlgorithm};
use kerneld::{load_script, EventScript, HostRuntime, HostRuntimeConfig};
use sim_kernel::KernelConfig;
use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Parsed command line
struct CliArgs {
    config: HostRuntimeConfig,
    script_path: Option<PathBuf>,
    verbose: u8,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("kerneld", String::as_str);

    let cli = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(1);
    });

    init_logging(cli.verbose);

    let script = match &cli.script_path {
        Some(path) => load_script(path).map_err(|e| e.to_string()),
        None => read_stdin_script(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Failed to load script: {}", e);
        process::exit(1);
    });

    let mut runtime = HostRuntime::new(cli.config, script).unwrap_or_else(|e| {
        eprintln!("Failed to create runtime: {}", e);
        process::exit(1);
    });

    let stdout = io::stdout();
    if let Err(e) = runtime.run(&mut stdout.lock()) {
        eprintln!("Runtime error: {}", e);
        process::exit(1);
    }
}

/// Logs go to stderr so stdout carries only replay output
fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}

fn read_stdin_script() -> Result<EventScript, String> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .map_err(|e| format!("Failed to read stdin: {}", e))?;
    EventScript::from_text(&text).map_err(|e| e.to_string())
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut kernel = KernelConfig::default();
    let mut max_steps = 0;
    let mut script_path = None;
    let mut verbose = 0u8;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--algorithm" | "-a" => {
                let value = option_value(args, &mut i, "--algorithm")?;
                kernel.algorithm = value
                    .parse::<SchedulingAlgorithm>()
                    .map_err(|_| format!("Invalid algorithm: {}", value))?;
            }
            "--memory" => {
                let value = option_value(args, &mut i, "--memory")?;
                kernel.memory_size =
                    parse_size(value).ok_or_else(|| format!("Invalid memory size: {}", value))?;
            }
            "--kernel-memory" => {
                let value = option_value(args, &mut i, "--kernel-memory")?;
                kernel.kernel_reserved = parse_size(value)
                    .ok_or_else(|| format!("Invalid kernel memory size: {}", value))?;
            }
            "--logical-base" => {
                let value = option_value(args, &mut i, "--logical-base")?;
                let base = parse_address(value)
                    .ok_or_else(|| format!("Invalid logical base: {}", value))?;
                kernel = kernel.with_logical_base(base);
            }
            "--quantum" => {
                let value = option_value(args, &mut i, "--quantum")?;
                kernel.quantum = parse_positive(value, "quantum")?;
            }
            "--level-threshold" => {
                let value = option_value(args, &mut i, "--level-threshold")?;
                kernel.level_switch_threshold = parse_positive(value, "level threshold")?;
            }
            "--tick" => {
                let value = option_value(args, &mut i, "--tick")?;
                kernel.timer_tick = parse_positive(value, "tick")?;
            }
            "--script" | "-s" => {
                let value = option_value(args, &mut i, "--script")?;
                script_path = Some(PathBuf::from(value));
            }
            "--max-steps" => {
                let value = option_value(args, &mut i, "--max-steps")?;
                max_steps = value
                    .parse()
                    .map_err(|_| format!("Invalid max-steps value: {}", value))?;
            }
            "-v" | "--verbose" => verbose = verbose.saturating_add(1),
            "-vv" => verbose = verbose.saturating_add(2),
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    kernel.validate().map_err(|e| e.to_string())?;
    Ok(CliArgs {
        config: HostRuntimeConfig { kernel, max_steps },
        script_path,
        verbose,
    })
}

fn option_value<'a>(args: &'a [String], i: &mut usize, name: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing value for {}", name))
}

fn parse_positive(value: &str, what: &str) -> Result<u64, String> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Invalid {}: {}", what, value)),
    }
}

/// Accepts decimal or `0x`-prefixed hex
fn parse_address(value: &str) -> Option<u64> {
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -a, --algorithm <ALG>      FCFS (default), RR, Priority or Multilevel");
    eprintln!("  --memory <SIZE>            Physical memory size (default 20MiB)");
    eprintln!("  --kernel-memory <SIZE>     Kernel space at address 0 (default 10MiB)");
    eprintln!("  --logical-base <ADDR>      First logical address of every process (default 0x20000000)");
    eprintln!("  --quantum <N>              Time slice in time units (default 40)");
    eprintln!("  --level-threshold <N>      Multilevel level budget (default 200)");
    eprintln!("  --tick <N>                 Time units per timer interrupt (default 10)");
    eprintln!("  -s, --script <FILE>        Event script; .json files hold an event list");
    eprintln!("                             (reads a line script from stdin if omitted)");
    eprintln!("  --max-steps <N>            Maximum events to replay (0 = unlimited)");
    eprintln!("  -v, --verbose              More logging; repeat for debug and trace");
    eprintln!("  -h, --help                 Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --algorithm priority --script demos/priority.events", program);
    eprintln!("  {} -a multilevel -v < workload.events", program);
}
