use clap::Parser;
use event_orchestrator::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => cli::run::execute(&args).await,
        Commands::Events(args) => cli::events::execute(&args),
        Commands::CheckConfig(args) => cli::check::execute_config(&args.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
