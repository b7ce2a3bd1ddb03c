pub mod commands;

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::{Client, EventHandler, GatewayIntents};

use anyhow::{Context, Result};

use std::sync::Arc;

use crate::config::Config;
use commands::{BotState, Commands, Reply};

pub async fn run_leekbot(config: &Config, state: BotState) -> Result<()> {
    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = LeekHandler { state: Arc::new(state) };
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .context("Error creating client.")?;

    client.start().await?;

    Ok(())
}

struct LeekHandler {
    state: Arc<BotState>,
}

#[async_trait]
impl EventHandler for LeekHandler {
    async fn ready(&self, _ctx: serenity::client::Context, ready: Ready) {
        log::info!("{} is connected and ready!", ready.user.name);
    }

    async fn message(&self, ctx: serenity::client::Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let Some(input) = msg.content.strip_prefix(self.state.call_token) else { return };
        if input.trim().is_empty() {
            return;
        }

        let response = match Commands::run_command(&self.state, input).await {
            Ok(Reply::Text(message)) => message,
            Ok(Reply::Done) => {
                let check = serenity::all::ReactionType::Unicode(String::from("✅"));
                if let Err(why) = msg.react(&ctx.http, check).await {
                    log::error!("Error reacting to message: {why:?}");
                }
                return;
            }
            Err(err) => {
                log::error!("Command '{input}' failed: {err:#}");
                format!("Error: {err}")
            }
        };

        // Discord doesn't like sending empty messages.
        if response.is_empty() { return; }

        // If the response can't be sent, try to at least let the user know.
        if let Err(why) = msg.channel_id.say(&ctx.http, response).await {
            let _ = msg.channel_id.say(&ctx.http, "Oops, internal error.").await;
            log::error!("Error sending message: {why:?}");
        }
    }
}
