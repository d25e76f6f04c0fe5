mod commands;
mod terminal;

use commands::{CommandLine, Commands, run, validate};
use terminal::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging(commands.verbose);

    match commands.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Validate(args) => validate::validate(args),
    }
}
