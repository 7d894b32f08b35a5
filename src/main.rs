use clap::Parser;
use tracing_subscriber::EnvFilter;

use ontoci::cli::Cli;
use ontoci::commands::execute_command;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "ontoci=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match execute_command(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(2);
        }
    }
}
