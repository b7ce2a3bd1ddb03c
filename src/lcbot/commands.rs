use crate::lcdb::{SqliteStore, StatsStore};
use crate::models::{RankingMode, Scope};
use crate::stats::StatsService;

use anyhow::{Context, Result, anyhow};
use itertools::Itertools;

const MAX_CMD_LENGTH: usize = 12;

// Discord rejects messages over 2000 characters.
const MAX_MESSAGE_LENGTH: usize = 2000;

/// Everything a command needs to run.
pub struct BotState {
    pub service: StatsService,
    pub store: SqliteStore,
    pub call_token: char,
}

/// A parsed command.
#[derive(Debug, PartialEq)]
pub enum Command {
    Leaderboard { mode: RankingMode, scope: Scope },
    Stats(String),
    Track(String),
    Untrack(String),
    Join { room: String, username: String },
    Leave { room: String, username: String },
    Tracklist(Scope),
    Help,
}

/// What the bot should do in response.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Text(String),
    /// React with a check mark instead of answering.
    Done,
}

pub struct Commands;
impl Commands {
    /// Runs `input` (the message without its call token).
    pub async fn run_command(state: &BotState, input: &str) -> Result<Reply> {
        let command = Self::parse(input, state.call_token)?;
        Self::execute(state, command).await
    }

    pub fn parse(input: &str, call_token: char) -> Result<Command> {
        // Split the message's content (on whitespace) into:
        // - The command (first token)
        // - Its parameters (all tokens afterwards)
        let split_tokens = input.split_whitespace().collect::<Vec<_>>();
        let Some((&command, parameters)) = split_tokens.split_first() else {
            return Err(anyhow!("Empty command, see {call_token}help for commands."));
        };

        let username_at = |index: usize, what: &str| -> Result<String> {
            let username = parameters
                .get(index)
                .with_context(|| format!("Expected username for {what}, got none."))?;
            Self::validate_username(username)
        };

        let room_at = |index: usize| -> Result<String> {
            Ok(parameters
                .get(index)
                .with_context(|| format!("Expected usage: `{call_token}{command} <room> <leetcode username>`"))?
                .to_string())
        };

        Ok(match command {
            "leaderboard" | "lb" => Self::parse_leaderboard(parameters)?,
            "stats" => Command::Stats(username_at(0, "stats")?),
            "track" => Command::Track(username_at(0, "tracking")?),
            "untrack" => Command::Untrack(username_at(0, "untracking")?),
            "join" => Command::Join { room: room_at(0)?, username: username_at(1, "join")? },
            "leave" => Command::Leave { room: room_at(0)?, username: username_at(1, "leave")? },
            "tracklist" => Command::Tracklist(
                parameters.first().map_or(Scope::All, |room| Scope::Room(room.to_string())),
            ),
            "help" => Command::Help,
            _ => {
                if Self::is_valid_cmd(command) {
                    log::info!("User submitted unknown command: {}", command);
                    return Err(anyhow!(
                        "No such command found: {}, see {call_token}help for commands.",
                        command
                    ));
                } else {
                    log::info!("User submitted invalid command: {}", command);
                    return Err(anyhow!("Invalid command syntax."));
                }
            }
        })
    }

    /// `leaderboard [competition|accuracy] [room]`
    fn parse_leaderboard(parameters: &[&str]) -> Result<Command> {
        let (mode, rest) = match parameters.split_first() {
            Some((first, rest)) => match first.parse::<RankingMode>() {
                Ok(mode) => (mode, rest),
                Err(_) => (RankingMode::default(), parameters),
            },
            None => (RankingMode::default(), parameters),
        };

        let scope = match rest {
            [] => Scope::All,
            [room] => Scope::Room(room.to_string()),
            _ => return Err(anyhow!("Expected at most one room name, got: {}", rest.join(" "))),
        };

        Ok(Command::Leaderboard { mode, scope })
    }

    pub async fn execute(state: &BotState, command: Command) -> Result<Reply> {
        let reply = match command {
            Command::Leaderboard { mode, scope } => Self::leaderboard(state, mode, scope).await?,
            Command::Stats(username) => {
                let snapshot = state.service.user_stats(&username).await?;
                Reply::Text(format!("**{username}**\n{snapshot}"))
            }
            Command::Track(username) => {
                // Only track users that actually exist on LeetCode.
                state.service.fetch_profile(&username).await?;
                if !state.store.track_user(&username).await? {
                    return Err(anyhow!("{username} is already being tracked."));
                }
                Reply::Done
            }
            Command::Untrack(username) => {
                if !state.store.untrack_user(&username).await? {
                    return Err(anyhow!("{username} is not being tracked."));
                }
                log::info!("Untracked {username}.");
                Reply::Done
            }
            Command::Join { room, username } => {
                if !state.store.join_room(&room, &username).await? {
                    return Err(match state.store.find_tracked_user(&username).await? {
                        Some(_) => anyhow!("{username} is already in {room}."),
                        None => anyhow!("{username} is not being tracked, `{}track` them first.",
                                        state.call_token),
                    });
                }
                log::info!("Added {username} to room '{room}'.");
                Reply::Done
            }
            Command::Leave { room, username } => {
                if !state.store.leave_room(&room, &username).await? {
                    return Err(anyhow!("{username} is not in {room}."));
                }
                Reply::Done
            }
            Command::Tracklist(scope) => {
                let users = state.store.list_tracked_users(&scope).await?;
                let mut output = String::from("**Tracked users:**");
                for user in users {
                    output += "\n\t";
                    output += &user.username;
                }
                Reply::Text(truncate_message(&output))
            }
            Command::Help => Reply::Text(Self::get_help(state.call_token)),
        };

        Ok(reply)
    }

    async fn leaderboard(state: &BotState, mode: RankingMode, scope: Scope) -> Result<Reply> {
        let board = state.service.leaderboard(&scope, mode).await?;
        if board.is_empty() {
            return Ok(Reply::Text(String::from("Nobody is being tracked here yet.")));
        }

        let title = match (&scope, mode) {
            (Scope::All, RankingMode::Competition) => String::from("**Leaderboard:**"),
            (Scope::All, RankingMode::Accuracy) => String::from("**Leaderboard (accuracy):**"),
            (Scope::Room(room), RankingMode::Competition) => format!("**{room} leaderboard:**"),
            (Scope::Room(room), RankingMode::Accuracy) => format!("**{room} leaderboard (accuracy):**"),
        };

        Ok(Reply::Text(truncate_message(&format!("{title}\n{}", board.iter().join("\n")))))
    }
}

/// Non-async helpers
impl Commands {
    /// Ensures that the string slice conforms to C-like identifier regex
    fn is_valid_cmd(s: &str) -> bool {
        s.len() <= MAX_CMD_LENGTH
            && regex::Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$")
                .is_ok_and(|re| re.is_match(s))
    }

    /// LeetCode usernames are letters, digits, '_' and '-'.
    fn validate_username(s: &str) -> Result<String> {
        let valid = regex::Regex::new(r"^[A-Za-z0-9_-]{1,40}$").is_ok_and(|re| re.is_match(s));
        if !valid {
            return Err(anyhow!("'{s}' is not a valid LeetCode username."));
        }
        Ok(s.to_string())
    }

    /// Gets a help string. Should be updated after a new command is added
    pub fn get_help(t: char) -> String {
        format!(
            r#"
**Command List:**
`{t}leaderboard [competition|accuracy] [room]`:  Rank tracked users by solves (or acceptance rate) since the competition started.
`{t}stats <leetcode username>`:  Get competition stats for a tracked user.
`{t}track <leetcode username>`:  Add a user to the leaderboard.
`{t}untrack <leetcode username>`:  Remove a user and their stats from the leaderboard.
`{t}join <room> <leetcode username>`:  Add a tracked user to a room.
`{t}leave <room> <leetcode username>`:  Remove a user from a room.
`{t}tracklist [room]`:  List all tracked users.
`{t}help`:  Get information on supported commands
"#,
        )
    }
}

/// Cuts `message` at a line boundary so that it fits in one Discord message.
fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_MESSAGE_LENGTH {
        return message.to_string();
    }

    const ELLIPSIS: &str = "\n...";
    let mut output = String::new();
    for line in message.lines() {
        if output.len() + line.len() + 1 + ELLIPSIS.len() > MAX_MESSAGE_LENGTH {
            break;
        }
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(line);
    }
    output.push_str(ELLIPSIS);
    output
}
