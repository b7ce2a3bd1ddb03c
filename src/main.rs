use anyhow::Result;

use std::sync::Arc;

use leekboard::config::Config;
use leekboard::lcapi::LeetCodeClient;
use leekboard::lcbot::{self, commands::BotState};
use leekboard::lcdb::SqliteStore;
use leekboard::stats::StatsService;

#[tokio::main]
async fn main() -> Result<()> {
    // Begin logger
    env_logger::init();

    let config = Config::from_env()?;
    log::info!(
        "Counting submissions since {} (database: {}).",
        config.competition_start, config.database_path.display()
    );

    // Initialize database
    let store = SqliteStore::open(&config.database_path)?;

    let leetcode = Arc::new(LeetCodeClient::new(&config.leetcode_url, config.request_timeout)?);
    let service = StatsService::new(
        leetcode.clone(),
        leetcode,
        Arc::new(store.clone()),
        config.competition_start,
        config.request_timeout,
    );

    let state = BotState {
        service,
        store,
        call_token: config.call_token,
    };

    lcbot::run_leekbot(&config, state).await
}
