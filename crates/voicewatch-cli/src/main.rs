//! voicewatch CLI
//!
//! Command-line front end for the voicewatch watch list: subscribe to
//! voice-channel joins, inspect who gets notified, and maintain the
//! underlying tables by hand.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use voicewatch_core::{Config, RecordStore, StoreError, Subscriptions};

mod commands;
mod logging;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "voicewatch")]
#[command(about = "voicewatch - Get told when someone joins a voice channel")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Watch(WatchCommands),
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

/// Commands that operate on the tables
#[derive(Subcommand)]
enum WatchCommands {
    /// Get notified when a subject joins a voice channel
    Monitor {
        /// Id of the user to watch
        subject: String,
        /// Id of the user to notify
        watcher: String,
        /// Contact address for the watcher (e.g. phone number)
        #[arg(short, long)]
        contact: Option<String>,
    },
    /// Stop receiving notifications for a subject
    #[command(alias = "stopmonitor")]
    Stop {
        /// Id of the watched user
        subject: String,
        /// Id of the user who no longer wants notifications
        watcher: String,
    },
    /// Show who gets notified when a subject joins
    Targets {
        /// Id of the watched user
        subject: String,
    },
    /// Show the subjects a watcher follows
    Watching {
        /// Id of the watcher
        watcher: String,
    },
    /// Show or change a watcher's contact address
    Contact {
        /// Id of the watcher
        watcher: String,
        /// Replace the contact address
        #[arg(long, conflicts_with = "forget")]
        set: Option<String>,
        /// Remove the contact address
        #[arg(long)]
        forget: bool,
    },
    /// Inspect or edit a table directly
    Table {
        /// Which table to operate on
        #[arg(value_enum)]
        table: TableName,
        #[command(subcommand)]
        command: TableCommands,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TableName {
    /// Subject -> watchers
    Watchers,
    /// Watcher -> contact
    Contacts,
}

#[derive(Subcommand)]
enum TableCommands {
    /// List all records
    #[command(alias = "ls")]
    List,
    /// Show one record
    Get {
        key: String,
    },
    /// Create a record, or merge values into an existing one
    Write {
        key: String,
        #[arg(required = true)]
        values: Vec<String>,
        /// Overwrite instead of merging
        #[arg(long, conflicts_with = "claim_check")]
        replace: bool,
        /// Replace instead of merging when another record already holds the first value
        #[arg(long)]
        claim_check: bool,
    },
    /// Replace the values of an existing record
    Update {
        key: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        key: String,
    },
    /// Remove one value from a record
    RemoveMember {
        key: String,
        member: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, delimiter, watchers_file, contacts_file, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

/// Exit status for filesystem failures, distinct from bad input
const EXIT_IO_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    let result = match cli.command {
        // Config commands don't need the tables
        Commands::Config { command } => match command.unwrap_or(ConfigCommands::Show) {
            ConfigCommands::Show => commands::config::show(config_path, &output),
            ConfigCommands::Set { key, value } => {
                commands::config::set(key, value, config_path, &output)
            }
        },
        Commands::Watch(command) => run(command, config_path, &output).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(hint) = recovery_hint(&err) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::from(exit_status(&err))
        }
    }
}

async fn run(
    command: WatchCommands,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    logging::init(&config);

    let subs = Subscriptions::open(&config).context("Failed to open tables")?;

    match command {
        WatchCommands::Monitor {
            subject,
            watcher,
            contact,
        } => commands::watch::monitor(&subs, subject, watcher, contact, output).await,
        WatchCommands::Stop { subject, watcher } => {
            commands::watch::stop(&subs, subject, watcher, output).await
        }
        WatchCommands::Targets { subject } => {
            commands::watch::targets(&subs, subject, output).await
        }
        WatchCommands::Watching { watcher } => {
            commands::watch::watching(&subs, watcher, output).await
        }
        WatchCommands::Contact {
            watcher,
            set,
            forget,
        } => commands::watch::contact(&subs, watcher, set, forget, output).await,
        WatchCommands::Table { table, command } => {
            let store = select_table(&subs, table);
            handle_table_command(store, command, output).await
        }
    }
}

/// The store error behind a command failure, if any
fn store_error(err: &anyhow::Error) -> Option<&StoreError> {
    err.chain().find_map(|cause| cause.downcast_ref::<StoreError>())
}

fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    store_error(err).and_then(StoreError::recovery_suggestion)
}

fn exit_status(err: &anyhow::Error) -> u8 {
    match store_error(err) {
        Some(store_err) if store_err.is_io() => EXIT_IO_FAILURE,
        _ => 1,
    }
}

fn select_table(subs: &Subscriptions, table: TableName) -> &RecordStore {
    match table {
        TableName::Watchers => subs.watchers(),
        TableName::Contacts => subs.contacts(),
    }
}

async fn handle_table_command(
    store: &RecordStore,
    command: TableCommands,
    output: &Output,
) -> Result<()> {
    use commands::table;

    match command {
        TableCommands::List => table::list(store, output).await,
        TableCommands::Get { key } => table::get(store, key, output).await,
        TableCommands::Write {
            key,
            values,
            replace,
            claim_check,
        } => table::write(store, key, values, replace, claim_check, output).await,
        TableCommands::Update { key, values } => table::update(store, key, values, output).await,
        TableCommands::Delete { key } => table::delete(store, key, output).await,
        TableCommands::RemoveMember { key, member } => {
            table::remove_member(store, key, member, output).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_monitor_with_contact() {
        let cli = Cli::try_parse_from([
            "voicewatch",
            "monitor",
            "1001",
            "2002",
            "--contact",
            "+15550100",
        ])
        .unwrap();

        match cli.command {
            Commands::Watch(WatchCommands::Monitor {
                subject,
                watcher,
                contact,
            }) => {
                assert_eq!(subject, "1001");
                assert_eq!(watcher, "2002");
                assert_eq!(contact.as_deref(), Some("+15550100"));
            }
            _ => panic!("expected monitor command"),
        }
    }

    #[test]
    fn test_parse_table_write_replace() {
        let cli = Cli::try_parse_from([
            "voicewatch",
            "--json",
            "table",
            "contacts",
            "write",
            "2002",
            "+15550100",
            "--replace",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Watch(WatchCommands::Table {
                table: TableName::Contacts,
                command:
                    TableCommands::Write {
                        key,
                        values,
                        replace,
                        claim_check,
                    },
            }) => {
                assert_eq!(key, "2002");
                assert_eq!(values, vec!["+15550100".to_string()]);
                assert!(replace);
                assert!(!claim_check);
            }
            _ => panic!("expected table write command"),
        }
    }

    #[test]
    fn test_table_write_requires_values() {
        assert!(Cli::try_parse_from(["voicewatch", "table", "watchers", "write", "1001"]).is_err());
    }

    #[test]
    fn test_replace_conflicts_with_claim_check() {
        assert!(Cli::try_parse_from([
            "voicewatch",
            "table",
            "watchers",
            "write",
            "1001",
            "2002",
            "--replace",
            "--claim-check",
        ])
        .is_err());
    }

    #[test]
    fn test_stopmonitor_alias() {
        let cli = Cli::try_parse_from(["voicewatch", "stopmonitor", "1001", "2002"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Watch(WatchCommands::Stop { .. })
        ));
    }

    #[test]
    fn test_config_without_subcommand_parses() {
        let cli = Cli::try_parse_from(["voicewatch", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { command: None }));
    }

    #[test]
    fn test_permission_failure_gets_hint_and_io_status() {
        let denied = StoreError::from_write_io(
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            PathBuf::from("/data/watchers.csv"),
        );
        let err = anyhow::Error::new(denied).context("Failed to write record");

        assert!(recovery_hint(&err).is_some());
        assert_eq!(exit_status(&err), EXIT_IO_FAILURE);
    }

    #[test]
    fn test_plain_errors_exit_with_one() {
        let err = anyhow::anyhow!("Key not found: 1001");
        assert_eq!(recovery_hint(&err), None);
        assert_eq!(exit_status(&err), 1);
    }

    #[tokio::test]
    async fn test_invalid_argument_is_not_an_io_failure() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = RecordStore::open(temp_dir.path().join("watchers.csv"));
        let output = Output::new(OutputFormat::Quiet);

        let err = handle_table_command(
            &store,
            TableCommands::Write {
                key: "10,01".to_string(),
                values: vec!["2002".to_string()],
                replace: false,
                claim_check: false,
            },
            &output,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            store_error(&err),
            Some(StoreError::InvalidArgument { .. })
        ));
        assert_eq!(exit_status(&err), 1);
    }

    #[tokio::test]
    async fn test_table_commands_against_temp_store() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = RecordStore::open(temp_dir.path().join("watchers.csv"));
        let output = Output::new(OutputFormat::Quiet);

        handle_table_command(
            &store,
            TableCommands::Write {
                key: "1001".to_string(),
                values: vec!["2002".to_string(), "3003".to_string()],
                replace: false,
                claim_check: false,
            },
            &output,
        )
        .await
        .unwrap();

        handle_table_command(
            &store,
            TableCommands::RemoveMember {
                key: "1001".to_string(),
                member: "2002".to_string(),
            },
            &output,
        )
        .await
        .unwrap();

        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            "1001,3003"
        );

        // Missing keys surface as command errors
        assert!(handle_table_command(
            &store,
            TableCommands::Delete {
                key: "nope".to_string()
            },
            &output,
        )
        .await
        .is_err());
    }
}
