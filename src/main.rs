//! blockvcs - command-line host for the versioning service.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use blockvcs::api::{Repl, ServiceConfig, ServiceHandle};

/// Branch/commit versioning for item trees
#[derive(Parser, Debug)]
#[command(name = "blockvcs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the JSON documents
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Document to open (created if missing)
    #[arg(long, default_value = "workspace")]
    document: String,

    /// Name of the first branch of a new document
    #[arg(long, default_value = "default")]
    branch_name: String,

    /// Keep everything in memory
    #[arg(long)]
    no_persist: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Run one JSON request, print the response and exit
    #[arg(short, long, value_name = "JSON")]
    execute: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ServiceConfig::default()
        .data_dir(&cli.data_dir)
        .document(&cli.document)
        .default_branch_name(&cli.branch_name)
        .persist(!cli.no_persist)
        .autosave(!cli.no_persist)
        .verbose(cli.verbose);

    let service = match ServiceHandle::open(config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error opening document: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(request) = cli.execute {
        match service.handle_json(&request) {
            Ok(out) => {
                println!("{}", out);
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("{}", e.to_json());
                ExitCode::FAILURE
            }
        }
    } else {
        match Repl::new(service).run() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
