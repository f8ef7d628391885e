//! `migra list`: list the applications of an installation.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::topology;
use crate::commands::PlatformArgs;

/// Run `migra list`.
///
/// # Errors
///
/// Returns an error if the installation cannot be reached or an application
/// cannot be resolved.
pub async fn run(app: &AppContext, args: &PlatformArgs) -> Result<ExitCode> {
    let config = app.config()?;
    let platform = args.connect(&config).await?;
    let applications = topology::list_all(&platform).await?;
    app.renderer().render_applications(&applications)?;
    Ok(ExitCode::SUCCESS)
}
