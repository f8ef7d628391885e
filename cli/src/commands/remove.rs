//! `migra remove <app>`: delete an application from an installation.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::removal::remove;
use crate::commands::PlatformArgs;

#[derive(Args)]
pub struct RemoveArgs {
    /// Application name
    pub application: String,

    #[command(flatten)]
    pub platform: PlatformArgs,
}

/// Run `migra remove`.
///
/// # Errors
///
/// Returns `NotFound` when the application does not exist, and otherwise
/// the first deletion that failed.
pub async fn run(app: &AppContext, args: &RemoveArgs) -> Result<ExitCode> {
    let prompt = format!(
        "Remove application '{}' and all its servers from {}?",
        args.application, args.platform.platform
    );
    if !app.confirm(&prompt, false)? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let config = app.config()?;
    let (engine, _) = AppContext::engine(&config);
    let platform = args.platform.connect(&config).await?;
    {
        let reporter = app.reporter();
        remove(&platform, &reporter, &args.application, &engine.server_wait).await?;
    }
    app.renderer().render_removed(&args.application)?;
    Ok(ExitCode::SUCCESS)
}
