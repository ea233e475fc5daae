use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use tagsort::cli::Args;
use tagsort::config::{FileConfig, OrganizeConfig};
use tagsort::pool::CancelFlag;
use tagsort::{logging, runtime};

fn main() -> ExitCode {
    let start = Instant::now();
    let args = Args::parse();
    if let Err(e) = logging::init(start, args.verbose) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    let config = match FileConfig::discover(args.config.as_deref())
        .and_then(|file| OrganizeConfig::resolve(&args, &file))
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancelFlag::new();
    if let Err(e) = runtime::install_interrupt_handler(cancel.clone()) {
        tracing::warn!("interrupt handler not installed: {e:#}");
    }

    match runtime::run(&config, &cancel) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
