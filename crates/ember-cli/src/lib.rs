//! Command-line driver: `ember run <path>` and `ember repl`.
//!
//! Keeps the teacher's `clap::Parser`/`Subcommand` shape and the
//! "`main.rs` sets up the environment, `lib.rs::run()` does the work"
//! split, but there is no manifest, build, or disasm subcommand here —
//! the language has no persisted bytecode format to build or disassemble
//! (see DESIGN.md).

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use ember_core::Heap;
use ember_vm::{Vm, VmOptions};

/// Exit code for a successful run, matching spec.md §6's driver contract.
pub const EXIT_OK: i32 = 0;
/// Exit code when the source fails to compile.
pub const EXIT_COMPILE_ERROR: i32 = 65;
/// Exit code when a compiled script raises a runtime error.
pub const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(Parser, Debug)]
#[command(name = "ember", version, about = "The Ember language tool")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Cmd>,

    /// Force a garbage collection before every allocation (testing knob).
    #[arg(long, global = true)]
    stress_gc: bool,

    /// Increase log verbosity; repeat for more (overridden by RUST_LOG).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compile and run a script file.
    Run {
        /// Path to the `.ember` source file.
        path: PathBuf,
    },
    /// Start a line-oriented REPL.
    Repl,
}

/// Entry point called from `main`. Returns the process exit code to use;
/// does not call `std::process::exit` itself so it stays unit-testable.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = VmOptions::default().with_stress_gc(cli.stress_gc);
    match cli.cmd {
        Some(Cmd::Run { path }) => run_file(&path, options),
        Some(Cmd::Repl) | None => {
            run_repl(options);
            Ok(EXIT_OK)
        }
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn run_file(path: &PathBuf, options: VmOptions) -> Result<i32> {
    let source = std::fs::read_to_string(path)?;
    let mut heap = Heap::new();
    let mut vm = Vm::new(&mut heap, options);

    let script = match ember_compiler::compile(&source, &mut heap) {
        Ok(script) => script,
        Err(errors) => {
            for error in errors {
                eprintln!("{error}");
            }
            return Ok(EXIT_COMPILE_ERROR);
        }
    };

    match vm.interpret(&mut heap, script) {
        Ok(()) => Ok(EXIT_OK),
        Err(error) => {
            eprint!("{error}");
            Ok(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run_repl(options: VmOptions) {
    let mut heap = Heap::new();
    let mut vm = Vm::new(&mut heap, options);
    let mut line = String::new();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        line.clear();
        let bytes_read = match std::io::stdin().read_line(&mut line) {
            Ok(n) => n,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        if bytes_read == 0 {
            println!();
            return;
        }
        if line.trim().is_empty() {
            continue;
        }

        match ember_compiler::compile(&line, &mut heap) {
            Ok(script) => {
                if let Err(error) = vm.interpret(&mut heap, script) {
                    eprint!("{error}");
                }
            }
            Err(errors) => {
                for error in errors {
                    eprintln!("{error}");
                }
            }
        }
    }
}
