//! `migra snapshot <app>`: capture an application and keep it on disk.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::snapshot::snapshot;
use crate::commands::PlatformArgs;

#[derive(Args)]
pub struct SnapshotArgs {
    /// Application name
    pub application: String,

    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Remove images and artifacts already created when a service fails
    #[arg(long)]
    pub rollback: bool,

    /// Services captured at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Run `migra snapshot`.
///
/// # Errors
///
/// Returns an error if the application cannot be resolved or a service
/// cannot be captured.
pub async fn run(app: &AppContext, args: &SnapshotArgs) -> Result<ExitCode> {
    let config = app.config()?;
    let (mut engine, store) = AppContext::engine(&config);
    engine.rollback |= args.rollback;
    if let Some(limit) = args.concurrency {
        engine.concurrency = limit.max(1);
    }

    let platform = args.platform.connect(&config).await?;
    let snap = {
        let reporter = app.reporter();
        snapshot(&platform, &store, &reporter, &args.application, &engine).await?
    };
    app.renderer().render_snapshot(&snap)?;
    Ok(ExitCode::SUCCESS)
}
