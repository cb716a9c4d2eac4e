use clap::Parser;
use colored::Colorize;

use marketview::cli::{Cli, Commands};
use marketview::config::{get_config, init_config_from};
use marketview::errors::MarketviewError;
use marketview::runtime;
use marketview::system::init_logging;

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(&cli.config);
    let config = get_config();

    if let Some(Commands::ConfigGen { output, force }) = &cli.command {
        if let Err(e) = runtime::run_config_gen(output.as_deref(), *force) {
            eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
            std::process::exit(1);
        }
        return;
    }

    let _log_guard = match init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", MarketviewError::config(format!("{:#}", e)).format_colored());
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Stats { kind, id }) => runtime::run_stats(kind, id).await,
        Some(Commands::Serve) | None => runtime::run_server().await,
        Some(Commands::ConfigGen { .. }) => Ok(()),
    };

    if let Err(e) = result {
        match e.downcast_ref::<MarketviewError>() {
            Some(err) => eprintln!("{}", err.format_colored()),
            None => eprintln!("{} {:#}", "[ERROR]".red().bold(), e),
        }
        std::process::exit(1);
    }
}
