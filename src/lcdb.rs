pub mod schema;
pub mod statscache;
pub mod users;

use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::Connection;
use serenity::async_trait;

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{StatsError, StatsResult};
use crate::models::{CachedEntry, Scope, TrackedUser};

pub type DBResult<T> = rusqlite::Result<T>;

/// What the stats core needs from persistence.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn find_cached_entry(&self, username: &str) -> StatsResult<Option<CachedEntry>>;

    /// Replaces whatever is cached for `entry.username`.
    async fn upsert_cached_entry(&self, entry: &CachedEntry) -> StatsResult<()>;

    /// Tracked users in `scope`, in insertion order.
    async fn list_tracked_users(&self, scope: &Scope) -> StatsResult<Vec<TrackedUser>>;

    async fn find_tracked_user(&self, username: &str) -> StatsResult<Option<TrackedUser>>;
}

/// SQLite-backed store. Calls run on tokio's blocking pool against one
/// shared connection.
#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::initialize(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(connection: Connection) -> Result<Self> {
        for schema in schema::ALL_SCHEMAS {
            log::debug!("[initialize_db] {}", schema.lines().next().unwrap_or_default());
            connection.execute(schema, [])?;
        }

        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let connection = connection
                .lock()
                .map_err(|_| anyhow!("Database connection lock poisoned."))?;
            op(&*connection)
        })
        .await?
    }

    /// Starts tracking `username`. Returns `false` if they already were.
    pub async fn track_user(&self, username: &str) -> Result<bool> {
        let username = username.to_string();
        self.run(move |conn| Ok(users::insert_tracked_user(conn, &username, Utc::now())?))
            .await
    }

    /// Stops tracking `username`, dropping their cached stats and room
    /// memberships. Returns `false` if they weren't tracked.
    pub async fn untrack_user(&self, username: &str) -> Result<bool> {
        let username = username.to_string();
        self.run(move |conn| Ok(users::delete_tracked_user(conn, &username)?))
            .await
    }

    /// Returns `false` if the user is already in the room or isn't tracked.
    pub async fn join_room(&self, room: &str, username: &str) -> Result<bool> {
        let (room, username) = (room.to_string(), username.to_string());
        self.run(move |conn| Ok(users::insert_membership(conn, &room, &username)?))
            .await
    }

    pub async fn leave_room(&self, room: &str, username: &str) -> Result<bool> {
        let (room, username) = (room.to_string(), username.to_string());
        self.run(move |conn| Ok(users::delete_membership(conn, &room, &username)?))
            .await
    }
}

#[async_trait]
impl StatsStore for SqliteStore {
    async fn find_cached_entry(&self, username: &str) -> StatsResult<Option<CachedEntry>> {
        let username = username.to_string();
        self.run(move |conn| statscache::query_cached_entry(conn, &username))
            .await
            .map_err(|err| StatsError::CacheUnavailable(format!("{err:#}")))
    }

    async fn upsert_cached_entry(&self, entry: &CachedEntry) -> StatsResult<()> {
        let entry = entry.clone();
        self.run(move |conn| statscache::upsert_cached_entry(conn, &entry))
            .await
            .map_err(|err| StatsError::CacheUnavailable(format!("{err:#}")))
    }

    async fn list_tracked_users(&self, scope: &Scope) -> StatsResult<Vec<TrackedUser>> {
        let scope = scope.clone();
        self.run(move |conn| match &scope {
            Scope::All => Ok(users::query_tracked_users(conn)?),
            Scope::Room(room) => Ok(users::query_room_members(conn, room)?),
        })
        .await
        .map_err(|err| StatsError::Persistence(format!("{err:#}")))
    }

    async fn find_tracked_user(&self, username: &str) -> StatsResult<Option<TrackedUser>> {
        let username = username.to_string();
        self.run(move |conn| Ok(users::query_tracked_user(conn, &username)?))
            .await
            .map_err(|err| StatsError::Persistence(format!("{err:#}")))
    }
}

/// Turns a uniqueness violation into `Ok(false)`: the row was already there.
pub fn swallow_constraint_violation(err: rusqlite::Error) -> DBResult<bool> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Ok(false)
        }
        err => Err(err),
    }
}
