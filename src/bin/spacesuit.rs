//! SPACESUIT: a thin command-line front end over the `spp` protocol stack.
//!
//! Mirrors `original_source`'s `spacesuit.py`: one command from the command
//! line, a script file, or an interactive prompt, all routed through
//! [`spp::session::Session::run_line`]/`run_script`. The REPL-only `help` and
//! `telemetry` keywords and tab completion are not carried forward here —
//! `spec.md` §1 places the interactive help surface out of core scope, and
//! this binary exists to exercise the library against a real port, not to
//! reproduce the REPL shell.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;

use spp::catalog;
use spp::message::MessageParser;
use spp::session::Session;
use spp::transport::Transport;

/// SPACESUIT: Serial Protocol for ACE Scriptable User Interface Tool
#[derive(Parser, Debug)]
#[command(version, about, group(
    clap::ArgGroup::new("mode").required(true).args(["command", "script", "interactive"])
))]
struct Opt {
    /// Serial port device to use
    #[arg(long, short = 'p', default_value = "/dev/ttyUSB0")]
    port: String,

    /// SPACE device address, range 0-15
    #[arg(long, visible_alias = "addr", short = 'a', default_value_t = 5,
          value_parser = clap::value_parser!(u8).range(0..=15))]
    address: u8,

    /// Thruster product name
    #[arg(long, short = 't', default_value = "ace_radhard",
          value_parser = ["ace_radhard", "ace_max"])]
    thruster: String,

    /// Prefix for the log filename
    #[arg(long, visible_alias = "log", short = 'l', default_value = "suit")]
    logname: String,

    /// File containing script macro definitions
    #[arg(long = "macro-file", visible_alias = "macro", short = 'm')]
    macro_file: Option<std::path::PathBuf>,

    /// Output additional packet debugging information
    #[arg(long, short = 'd')]
    debug: bool,

    /// Increase logging verbosity (may be repeated)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// SPACE command string to execute
    #[arg(long, visible_alias = "cmd", short = 'c')]
    command: Option<String>,

    /// Log file containing SPACE commands to execute
    #[arg(long, visible_alias = "scr", short = 's')]
    script: Option<std::path::PathBuf>,

    /// Start interactive command prompt
    #[arg(long, visible_alias = "int", short = 'i')]
    interactive: bool,
}

fn build_session(opt: &Opt, echo: bool) -> Result<Session> {
    let registry = catalog::registry_for(&opt.thruster)?;
    let message_parser = MessageParser::from_registry(&registry)?;
    let transport = Transport::open(&opt.port, opt.address, message_parser)
        .with_context(|| format!("opening serial port {:?}", opt.port))?;
    let log_registry = catalog::registry_for(&opt.thruster)?;
    let log_prefix = format!("{}_", opt.logname);
    let mut session = Session::new(transport, log_registry, &log_prefix, echo || opt.debug)?;
    if let Some(path) = &opt.macro_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading macro file {path:?}"))?;
        session.load_macros(&text);
    }
    Ok(session)
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .module("spp")
        .quiet(false)
        .verbosity(opt.verbose as usize)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let mut session = build_session(&opt, true)?;

    if let Some(command) = &opt.command {
        if let Err(err) = session.run_line(command, true) {
            eprintln!("{err}");
        }
    } else if let Some(path) = &opt.script {
        let script = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {path:?}"))?;
        session.run_script(&script, true)?;
    } else if opt.interactive {
        println!("Enter 'quit' to exit.\n");
        let stdin = std::io::stdin();
        loop {
            print!("> ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            let bytes_read = stdin.lock().read_line(&mut line)?;
            if bytes_read == 0 {
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                println!("Enter 'quit' to exit.\n");
                continue;
            }
            if line == "quit" {
                break;
            }
            match session.run_line(line, true) {
                Ok(_) => {}
                Err(err) => eprintln!("{err}\n"),
            }
        }
    }

    Ok(())
}
