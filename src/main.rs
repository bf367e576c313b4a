// skillmart - plugin marketplace client entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use skillmart::cli::Cli;
use skillmart::commands;
use skillmart::models::response::CommandResponse;
use skillmart::utils::error::AppError;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let json = cli.json;

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => return report(&AppError::Io(e), json),
    };

    let output = match runtime.block_on(commands::dispatch(cli)) {
        Ok(output) => output,
        Err(e) => return report(&e, json),
    };

    match output.render(json) {
        Ok(text) if !text.is_empty() => println!("{}", text),
        Ok(_) => {}
        Err(e) => return report(&e, json),
    }
    for failure in &output.failures {
        eprintln!("error[{}]: {}", failure.kind(), failure);
    }

    if output.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` overrides the
/// default level.
fn init_logging(verbose: bool) {
    let default = if verbose { "skillmart=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report(err: &AppError, json: bool) -> ExitCode {
    if json {
        if let Ok(body) = serde_json::to_string_pretty(&CommandResponse::<()>::err(err)) {
            println!("{}", body);
        }
    }
    eprintln!("error[{}]: {}", err.kind(), err);
    ExitCode::FAILURE
}
