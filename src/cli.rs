//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

use crate::views::EntityKind;

/// Marketview - view counting for shops and products
#[derive(Parser, Debug)]
#[command(name = "marketview")]
#[command(version)]
#[command(about = "View counting and deduplication service for a marketplace directory", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Generate an example configuration file
    ConfigGen {
        /// Output path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print view statistics for one shop or product
    Stats {
        /// Entity kind: shop | product
        #[arg(long)]
        kind: EntityKind,

        /// Entity id
        #[arg(long)]
        id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::try_parse_from(["marketview"]).unwrap();
        assert_eq!(cli.config, "config.toml");
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_stats_command() {
        let cli =
            Cli::try_parse_from(["marketview", "-c", "prod.toml", "stats", "--kind", "product", "--id", "42"])
                .unwrap();
        assert_eq!(cli.config, "prod.toml");
        assert_eq!(
            cli.command,
            Some(Commands::Stats {
                kind: EntityKind::Product,
                id: 42
            })
        );
    }

    #[test]
    fn test_stats_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["marketview", "stats", "--kind", "review", "--id", "1"]).is_err());
    }

    #[test]
    fn test_config_gen() {
        let cli = Cli::try_parse_from(["marketview", "config-gen", "--output", "out.toml"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::ConfigGen {
                output: Some("out.toml".into()),
                force: false
            })
        );
    }
}
