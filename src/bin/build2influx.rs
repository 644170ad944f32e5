use build2influx::cli::{commands, Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    build2influx::init_tracing();

    match cli.command {
        Commands::Init(args) => commands::execute_init(args)?,
        Commands::Serve(args) => commands::execute_serve(args).await?,
        Commands::Emit(args) => commands::execute_emit(args).await?,
    }

    Ok(())
}
