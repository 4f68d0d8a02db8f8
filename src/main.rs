use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use dirwin::app;
use dirwin::cli::Cli;
use dirwin::config::BrowserConfig;
use dirwin::util::setup_tracing;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dirwin error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();
    let config = BrowserConfig::load_or_init()?;
    app::run(cli, config)
}
