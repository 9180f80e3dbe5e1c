mod commands;
mod terminal;

use std::sync::Arc;

use anyhow::Context;
use commands::{CommandLine, Commands, connect, discover, forget, info, send};
use slidelink_common::store::{FileStore, KeyValueStore};
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();
    let cfg = commands.config();

    logging::init_logging();
    print::banner(cfg.no_banner, cfg.quiet);

    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&cfg.state_file)
            .with_context(|| format!("opening state file {}", cfg.state_file.display()))?,
    );

    match commands.command {
        Commands::Discover { targets } => {
            print::header("looking for presentation hosts", cfg.quiet);
            discover::discover(targets, &cfg, store).await
        }
        Commands::Connect { host, targets, mode } => {
            print::header("remote control", cfg.quiet);
            connect::connect(host, targets, mode, &cfg, store).await
        }
        Commands::Send { host, command } => send::send(&host, &command, &cfg, store).await,
        Commands::Forget => forget::forget(store.as_ref()),
        Commands::Info => {
            print::header("stored state", cfg.quiet);
            info::info(&cfg, store)
        }
    }
}
