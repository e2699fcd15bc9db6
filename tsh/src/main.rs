use crate::config::{Cli, ShellConfig};
use crate::repl::Repl;
use crate::shell::Shell;
use anyhow::{Result, anyhow};
use clap::Parser;
use libc::{STDERR_FILENO, STDOUT_FILENO};
use nix::unistd::dup2;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;
mod parser;
mod process;
mod proxy;
mod repl;
mod shell;

const LOG_ENV: &str = "TSH_LOG";
const VERBOSE_FILTER: &str = "tsh=debug,tsh_builtin=debug,tsh_types=debug";

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = ShellConfig::from(&cli);

    // one stream for everything the shell prints
    if let Err(err) = dup2(STDOUT_FILENO, STDERR_FILENO) {
        println!("dup2 error: {}", err.desc());
        return ExitCode::FAILURE;
    }

    if let Err(err) = init_tracing(config.verbose) {
        eprintln!("Failed to initialize tracing: {err}");
        return ExitCode::FAILURE;
    }

    match run_shell(config) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("tsh: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_shell(config: ShellConfig) -> Result<i32> {
    let mut shell = Shell::new(config);
    shell.set_signals()?;
    let ctx = shell.create_context();
    debug!("start shell {:?}", ctx);
    Repl::new(&mut shell).run(&ctx)
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { VERBOSE_FILTER } else { "off" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("{e}"))
}
