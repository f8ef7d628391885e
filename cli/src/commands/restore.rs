//! `migra restore <dir>`: restore a snapshot saved on disk.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::local_snapshot::load_snapshot;
use crate::application::services::restore::restore;
use crate::commands::PlatformArgs;

#[derive(Args)]
pub struct RestoreArgs {
    /// Snapshot directory printed by `migra snapshot`
    pub directory: PathBuf,

    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Delete resources already created when a service fails
    #[arg(long)]
    pub rollback: bool,

    /// Services restored at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Run `migra restore`.
///
/// # Errors
///
/// Returns `NotAvailable` when artifacts are missing from the directory,
/// and otherwise the first restore failure.
pub async fn run(app: &AppContext, args: &RestoreArgs) -> Result<ExitCode> {
    let config = app.config()?;
    let (mut engine, store) = AppContext::engine(&config);
    engine.rollback |= args.rollback;
    if let Some(limit) = args.concurrency {
        engine.concurrency = limit.max(1);
    }

    let snap = load_snapshot(&store, &args.directory).await?;
    let platform = args.platform.connect(&config).await?;
    let report = {
        let reporter = app.reporter();
        restore(&platform, &store, &reporter, &snap, &engine).await?
    };
    app.renderer().render_restore(&report)?;
    Ok(ExitCode::SUCCESS)
}
