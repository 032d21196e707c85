use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cost_console::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    match args.get_command() {
        // The server configures logging from its own config file
        cli::Commands::Start => {
            commands::start::execute(&args.config).await?;
        }
        cli::Commands::Test { check_aws } => {
            init_tracing("warn", "text");
            commands::test::execute(&args.config, check_aws).await?;
        }
        cli::Commands::Config { action } => {
            init_tracing("warn", "text");
            match action {
                cli::ConfigCommands::Show => commands::config::show(&args.config)?,
                cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
            }
        }
        cli::Commands::Version => {
            println!("Cost Console v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
