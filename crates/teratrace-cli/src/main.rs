//! TeraTrace CLI binary entrypoint.
//!
//! This is the main entry point for the `teratrace` command-line tool.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use teratrace_cli::cli::{Cli, Commands, LogFormat};
use teratrace_cli::commands::{CheckCommand, PipeCommand, SendCommand};

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<(), teratrace_cli::CliError> {
    let config = cli.client_config()?;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Send(args) => {
            let cmd = SendCommand::new(config);
            cmd.execute(&mut stdout, &args).await?;
        }
        Commands::Pipe(args) => {
            let cmd = PipeCommand::new(config);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            cmd.execute(stdin, &mut stdout, &args).await?;
        }
        Commands::Check => {
            let cmd = CheckCommand::new(config);
            cmd.execute(&mut stdout).await?;
        }
    }

    Ok(())
}
