mod cli;
mod commands;
mod error;
mod host;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "tvlink", &mut std::io::stdout());
            Ok(())
        }

        Command::Actions => {
            commands::send::list_actions();
            Ok(())
        }

        // Config commands work even when the file is missing or broken
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Session commands need a resolved config with a TV address
        Command::Run => {
            let resolved = commands::resolve(&cli.global)?;
            tracing::debug!(path = %resolved.path.display(), "starting session");
            commands::run::handle(&resolved).await
        }
        Command::Send(args) => {
            let resolved = commands::resolve(&cli.global)?;
            tracing::debug!(action = %args.action, "sending action");
            commands::send::handle(args, &resolved).await
        }
    }
}
