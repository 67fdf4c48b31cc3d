//! `triage`: run memcheck on one test executable and report leaks in
//! project test code.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::Write;
use std::path::PathBuf;

use memtriage::logging;
use memtriage::triage::{Runner, TriageConfig, EXIT_FAILURE};

#[derive(Debug, Parser)]
#[command(
    name = "triage",
    version,
    about = "Run valgrind memcheck on a test executable and report leaks in test code."
)]
struct TriageArgs {
    /// Test executable to instrument.
    executable: PathBuf,

    /// JSON configuration file (markers, memcheck flags, noise prefixes).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit logs as JSON on stderr.
    #[arg(long)]
    json_logs: bool,
}

fn parse_args() -> TriageArgs {
    match TriageArgs::try_parse() {
        Ok(args) => args,
        Err(e) if e.kind() == ErrorKind::DisplayVersion => {
            print!("{e}");
            std::process::exit(0);
        }
        Err(e) => {
            if !matches!(
                e.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::MissingRequiredArgument
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                eprint!("{e}");
            }
            println!("usage: triage <test_executable>\n");
            println!("{}", TriageArgs::command().render_help());
            std::process::exit(EXIT_FAILURE);
        }
    }
}

fn run(args: &TriageArgs) -> memtriage::Result<i32> {
    let config = match &args.config {
        Some(path) => TriageConfig::from_json_file(path)?,
        None => TriageConfig::default(),
    };
    let runner = Runner::new(config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let verdict = runner.run_single_test(&args.executable, &mut out)?;
    out.write_all(runner.render(&verdict).as_bytes())?;
    out.flush()?;
    Ok(verdict.exit_code())
}

fn main() {
    let args = parse_args();
    if args.json_logs {
        logging::init_tracing_json();
    } else {
        logging::init_tracing();
    }

    let code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            let stage = if e.is_setup_error() { "setup" } else { "triage" };
            // Reported once, on stdout below
            tracing::debug!(error = %e, stage, "Run failed");
            println!("{e}");
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}
