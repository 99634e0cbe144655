//! Interactive local session: commands go straight through the engine
//! against a local store, with no chat transport involved.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use fcbot_config::FcBotConfig;
use fcbot_core::clock::SystemClock;
use fcbot_core::engine::CheckinEngine;
use fcbot_storage::CheckinStore;

pub async fn run_repl(
    config: FcBotConfig,
    caller: String,
    db: Option<PathBuf>,
) -> anyhow::Result<()> {
    let store = match &db {
        Some(path) => CheckinStore::open(path)?,
        None => CheckinStore::open_in_memory()?,
    };
    let engine = CheckinEngine::new(
        Arc::new(store),
        Arc::new(SystemClock::new(config.tz()?)),
        crate::event_schedule(&config)?,
    );

    println!("{}", fcbot_core::text::USAGE);
    println!("(local session as `{caller}`; type `quit` to exit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let trimmed = line.trim();
        if trimmed == "quit" || trimmed == "exit" {
            break;
        }

        let reply = engine.handle_message(trimmed, &caller).await?;
        println!("{reply}");
    }

    Ok(())
}
