use std::io::{self, BufRead, Write};

use clap::Parser;
use tracing::{error, info};

use gdbctl::{ControllerConfig, RecvTimeout, SyncController};

/// Interactive shell over a GDB/MI-speaking debugger.
#[derive(Parser, Debug)]
#[command(name = "gdbctl", about = "Drive a gdb session over its MI interpreter")]
struct Cli {
    /// Path to the debugger binary (defaults to "gdb" on PATH).
    #[arg(long)]
    gdb: Option<String>,

    /// Value for gdb's --data-directory.
    #[arg(long)]
    data_directory: Option<String>,

    /// Extra arguments forwarded verbatim to the debugger.
    #[arg(last = true)]
    extra_args: Vec<String>,

    /// Load ~/.gdbinit and site init files instead of suppressing them.
    #[arg(long)]
    allow_init_files: bool,

    /// Skip dynamic command discovery on startup.
    #[arg(long)]
    no_bind: bool,

    /// Emit info-level logs instead of only warnings.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    gdbctl::logging::init_logging(!cli.verbose);
    info!(event = "gdbctl.cli.start_started");

    let exit_code = match run(cli) {
        Ok(()) => {
            info!(event = "gdbctl.cli.start_completed");
            0
        }
        Err(e) => {
            error!(event = "gdbctl.cli.start_failed", error = %e);
            eprintln!("gdbctl: {e}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ControllerConfig {
        noinit: !cli.allow_init_files,
        ..ControllerConfig::default()
    };

    let mut ctrl = SyncController::new(&config)?;
    ctrl.spawn(
        cli.gdb.as_deref(),
        cli.data_directory.as_deref(),
        &cli.extra_args,
        config.noinit,
    )?;
    eprintln!("gdb spawned (PID of this shell: {}); type 'quit' to exit.", std::process::id());

    if !cli.no_bind {
        if let Err(e) = ctrl.bind_commands() {
            eprintln!("warning: dynamic command discovery failed: {e}");
        } else {
            eprintln!("discovered {} commands; type 'help' to list them.", ctrl.available_commands().len());
        }
    }

    repl(&mut ctrl)?;

    ctrl.shutdown();
    Ok(())
}

fn repl(ctrl: &mut SyncController) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("gdbctl> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF on stdin
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        if line == "help" {
            for (identifier, doc) in ctrl.available_commands() {
                let summary = doc.lines().nth(2).unwrap_or("").trim();
                println!("{identifier:<20} {summary}");
            }
            continue;
        }

        if let Some(mi_command) = line.strip_prefix('!') {
            if let Err(e) = ctrl.execute(mi_command, RecvTimeout::Inherit, true, false) {
                eprintln!("error: {e}");
            }
            continue;
        }

        let mut parts = line.split_whitespace();
        let identifier = parts.next().unwrap_or_default();
        let args: Vec<String> = parts.map(str::to_string).collect();

        // `call` already pretty-prints as it receives each record.
        if let Err(e) = ctrl.call(identifier, &args) {
            eprintln!("error: {e}");
        }
    }

    Ok(())
}
