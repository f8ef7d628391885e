//! `migra show <app>`: show the topology of one application.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::topology;
use crate::commands::PlatformArgs;

#[derive(Args)]
pub struct ShowArgs {
    /// Application name
    pub application: String,

    #[command(flatten)]
    pub platform: PlatformArgs,
}

/// Run `migra show`.
///
/// # Errors
///
/// Returns `NotFound` when the application does not exist.
pub async fn run(app: &AppContext, args: &ShowArgs) -> Result<ExitCode> {
    let config = app.config()?;
    let platform = args.platform.connect(&config).await?;
    let application = topology::resolve(&platform, &args.application).await?;
    app.renderer().render_application(&application)?;
    Ok(ExitCode::SUCCESS)
}
