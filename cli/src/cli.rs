//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Move multi-VM applications between OpenStack installations
#[derive(Parser)]
#[command(
    name = "migra",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    /// Log engine and HTTP activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Snapshot an application, restore it elsewhere and clean up
    Migrate(commands::migrate::MigrateArgs),

    /// List the applications of an installation
    List(commands::PlatformArgs),

    /// Show the topology of an application
    Show(commands::show::ShowArgs),

    /// Capture an application into a local snapshot
    Snapshot(commands::snapshot::SnapshotArgs),

    /// Restore a local snapshot onto an installation
    Restore(commands::restore::RestoreArgs),

    /// Delete an application from an installation
    Remove(commands::remove::RemoveArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Flags that shape the `AppContext`.
    #[must_use]
    pub fn flags(&self) -> AppFlags {
        AppFlags {
            output: OutputFlags {
                no_color: self.no_color,
                quiet: self.quiet,
                json: self.json,
            },
            behaviour: BehaviourFlags { yes: self.yes },
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self, app: &AppContext) -> Result<ExitCode> {
        match self.command {
            Command::Migrate(args) => commands::migrate::run(app, &args).await,
            Command::List(args) => commands::list::run(app, &args).await,
            Command::Show(args) => commands::show::run(app, &args).await,
            Command::Snapshot(args) => commands::snapshot::run(app, &args).await,
            Command::Restore(args) => commands::restore::run(app, &args).await,
            Command::Remove(args) => commands::remove::run(app, &args).await,
            Command::Config(cmd) => commands::config::run(app, cmd),
            Command::Version => commands::version::run(app),
        }
    }
}
