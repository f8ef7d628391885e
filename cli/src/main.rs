//! migra - move multi-VM applications between OpenStack installations

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use migra_cli::app::AppContext;
use migra_cli::cli::Cli;
use migra_cli::domain::error_kind;
use migra_cli::output::json;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let app = AppContext::new(&cli.flags());

    match cli.run(&app).await {
        Ok(code) => code,
        Err(e) => {
            report_error(&app, &e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins unless `--verbose` asks for engine debug logs.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("migra_cli=debug,warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report_error(app: &AppContext, err: &anyhow::Error) {
    let message = format!("{err:#}");
    if app.is_json() {
        match json::format_error(&message, error_kind(err).code()) {
            Ok(text) => println!("{text}"),
            Err(_) => eprintln!("Error: {message}"),
        }
    } else {
        eprintln!("Error: {message}");
    }
}
