use clap::Parser;
use fintrack::args::{Args, Command};
use fintrack::{api, commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().fintrack_home().path();

    // This allows for running the program without a server. When FINTRACK_IN_TEST_MODE is set and
    // non-zero in length, then the mode will be Mode::Testing, otherwise it will be Mode::Live.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.api_url(), init_args.currency_symbol())
                .await?
                .print()
        }

        Command::List(user_args) => {
            let config = Config::load(home).await?;
            let repository = api::repository(&config, mode)?;
            commands::list(&config, repository, user_args)
                .await?
                .print()
        }

        Command::Summary(user_args) => {
            let config = Config::load(home).await?;
            let repository = api::repository(&config, mode)?;
            commands::summary(&config, repository, user_args)
                .await?
                .print()
        }

        Command::Add(add_args) => {
            let config = Config::load(home).await?;
            let repository = api::repository(&config, mode)?;
            commands::add(&config, repository, add_args).await?.print()
        }

        Command::Delete(delete_args) => {
            let config = Config::load(home).await?;
            let repository = api::repository(&config, mode)?;
            commands::delete(&config, repository, delete_args)
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
