use anyhow::{Context, Result};
use chrono::DateTime;
use rusqlite::{Connection, OptionalExtension};

use crate::models;

/////*============== STATS CACHE QUERIES ==============*/
/// Reads the cached snapshot for `username`.
///
/// A row whose payload doesn't decode into a `StatsSnapshot` is an error, not
/// a miss; the caller decides what to do about it.
pub fn query_cached_entry(connection: &Connection, username: &str) -> Result<Option<models::CachedEntry>> {
    log::trace!("[query_cached_entry] Querying cached stats for {username}...");

    let row = connection
        .prepare("SELECT data, updated_at FROM StatsCache WHERE username = :username")?
        .query_row(rusqlite::named_params! { ":username": username }, |row| {
            Ok((row.get::<_, String>("data")?, row.get::<_, i64>("updated_at")?))
        })
        .optional()?;

    let Some((data, updated_at)) = row else { return Ok(None) };

    let snapshot = serde_json::from_str::<models::StatsSnapshot>(&data)
        .with_context(|| format!("Cached stats for {username} don't match the snapshot schema"))?;
    let updated_at = DateTime::from_timestamp_millis(updated_at)
        .with_context(|| format!("Cached stats for {username} have an invalid timestamp"))?;

    Ok(Some(models::CachedEntry { username: username.to_string(), snapshot, updated_at }))
}

/// Inserts or fully replaces the cached snapshot for `entry.username`.
pub fn upsert_cached_entry(connection: &Connection, entry: &models::CachedEntry) -> Result<()> {
    log::trace!("[upsert_cached_entry] Caching stats for {}...", entry.username);

    let data = serde_json::to_string(&entry.snapshot)
        .context("Couldn't serialize stats snapshot.")?;
    let query_params = rusqlite::named_params! {
        ":username":   entry.username,
        ":data":       data,
        ":updated_at": entry.updated_at.timestamp_millis(),
    };

    connection
        .prepare(
            "INSERT INTO StatsCache ( username,  data,  updated_at)
             VALUES                 (:username, :data, :updated_at)
             ON CONFLICT(username) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
        )?
        .execute(query_params)?;

    Ok(())
}
