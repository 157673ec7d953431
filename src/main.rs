mod commands;
mod config;
mod presenter;
mod sources;
mod utils;

use commands::forecast::Shell;
use config::{Config, ConfigError};
use log::*;
use presenter::terminal::TerminalView;
use thiserror::Error;
use tokio::sync::mpsc;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// custom error type for everything that stops the application from starting
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to set up the terminal: {0}")]
    Terminal(#[from] std::io::Error),
}


#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let config = Config::from_env()?;
    info!("Forecasts use {} units for {} days", config.forecast.units, config.forecast.days);

    let http_client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connection_verbose(config.verbose_logging)
        .build()?;

    let view = TerminalView::stdout(config.list_height)?;

    let (events, receiver) = mpsc::unbounded_channel();
    let input_events = events.clone();
    std::thread::spawn(move || commands::general::read_input(std::io::stdin().lock(), input_events));

    let shell = Shell::new(http_client, &config, view, events);
    shell.run(receiver).await;

    Ok(())
}
