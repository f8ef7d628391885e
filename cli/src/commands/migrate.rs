//! `migra migrate <app>`: move an application between installations.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::migrate::{MigrateOptions, migrate};
use crate::commands::AuthArgs;
use crate::infra::openstack::OpenStackPlatform;

#[derive(Args)]
pub struct MigrateArgs {
    /// Application name
    pub application: String,

    /// Identity (Keystone) endpoint of the source installation
    #[arg(long, env = "MIGRA_SRC")]
    pub src: String,

    /// Identity (Keystone) endpoint of the destination installation
    #[arg(long, env = "MIGRA_DST")]
    pub dst: String,

    #[command(flatten)]
    pub auth: AuthArgs,

    /// Keep the local snapshot after a successful restore
    #[arg(long)]
    pub keep: bool,

    /// Remove the application from the source once it runs on the destination
    #[arg(long)]
    pub remove_source: bool,

    /// Delete resources already created when a service fails
    #[arg(long)]
    pub rollback: bool,

    /// Services processed at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Run `migra migrate`.
///
/// # Errors
///
/// Returns the first failing phase: connection, snapshot, restore or source
/// removal.
pub async fn run(app: &AppContext, args: &MigrateArgs) -> Result<ExitCode> {
    let config = app.config()?;
    let (mut engine, store) = AppContext::engine(&config);
    engine.rollback |= args.rollback;
    if let Some(limit) = args.concurrency {
        engine.concurrency = limit.max(1);
    }
    let options = MigrateOptions {
        clean: !args.keep,
        remove_source: args.remove_source,
    };

    let credentials = args.auth.credentials();
    let source = OpenStackPlatform::connect(&args.src, &credentials, &config)
        .await
        .context("cannot connect to the source installation")?;
    let destination = OpenStackPlatform::connect(&args.dst, &credentials, &config)
        .await
        .context("cannot connect to the destination installation")?;

    let report = {
        let reporter = app.reporter();
        migrate(
            &source,
            &destination,
            &store,
            &reporter,
            &args.application,
            &engine,
            options,
        )
        .await?
    };
    app.renderer().render_migration(&report)?;
    Ok(ExitCode::SUCCESS)
}
