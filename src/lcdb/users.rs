use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::{lcdb::{DBResult, swallow_constraint_violation}, models};

/////*============== TRACKED USER QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::TrackedUser {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        let joined_millis: i64 = row.get("joined_date")?;
        let joined_date = DateTime::from_timestamp_millis(joined_millis).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                row.as_ref().column_index("joined_date").unwrap_or_default(),
                rusqlite::types::Type::Integer,
                format!("joined_date out of range: {joined_millis}").into(),
            )
        })?;

        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            joined_date,
        })
    }
}

/// Returns the tracked user with the username: `username`, if they exist.
pub fn query_tracked_user(connection: &Connection, username: &str) -> DBResult<Option<models::TrackedUser>> {
    connection
        .prepare("SELECT * FROM TrackedUsers WHERE username = :username")?
        .query_row(rusqlite::named_params! { ":username": username }, |row| {
            models::TrackedUser::try_from(row)
        })
        .optional()
}

/// Gathers all tracked users, oldest first.
pub fn query_tracked_users(connection: &Connection) -> DBResult<Vec<models::TrackedUser>> {
    log::trace!("[query_tracked_users] Querying all tracked users.");

    let mut stmt = connection.prepare("SELECT * FROM TrackedUsers ORDER BY id")?;
    let users = stmt
        .query_map([], |row| models::TrackedUser::try_from(row))?
        .collect::<DBResult<Vec<models::TrackedUser>>>()?;

    Ok(users)
}

/// Gathers the tracked users that are members of `room`, oldest first.
pub fn query_room_members(connection: &Connection, room: &str) -> DBResult<Vec<models::TrackedUser>> {
    log::trace!("[query_room_members] Querying members of room '{room}'.");

    let mut stmt = connection.prepare(
        "SELECT u.id, u.username, u.joined_date
         FROM TrackedUsers u
         JOIN Memberships m ON m.user_id = u.id
         WHERE m.room = :room
         ORDER BY u.id",
    )?;

    let users = stmt
        .query_map(rusqlite::named_params! { ":room": room }, |row| {
            models::TrackedUser::try_from(row)
        })?
        .collect::<DBResult<Vec<models::TrackedUser>>>()?;

    Ok(users)
}

/// Inserts a tracked user. Returns `true` if it was newly added, false otherwise.
pub fn insert_tracked_user(connection: &Connection, username: &str, joined: DateTime<Utc>) -> DBResult<bool> {
    log::trace!("[insert_tracked_user] Inserting user {username} into TrackedUsers...");

    let query_params = rusqlite::named_params! {
        ":username":    username,
        ":joined_date": joined.timestamp_millis(),
    };

    connection
        .prepare(
            "INSERT INTO TrackedUsers ( username,  joined_date)
             VALUES                   (:username, :joined_date)",
        )?
        .execute(query_params)
        .map_or_else(swallow_constraint_violation, |_| Ok(true))
        .inspect(|added| if *added { log::info!("User {username} is now being tracked.") })
}

/// Deletes a tracked user along with their memberships and cached stats.
/// Returns `true` if the user existed.
pub fn delete_tracked_user(connection: &Connection, username: &str) -> DBResult<bool> {
    let tx = connection.unchecked_transaction()?;
    let query_params = rusqlite::named_params! { ":username": username };

    tx.execute(
        "DELETE FROM Memberships
         WHERE user_id IN (SELECT id FROM TrackedUsers WHERE username = :username)",
        query_params,
    )?;
    tx.execute("DELETE FROM StatsCache WHERE username = :username", query_params)?;
    let removed = tx.execute("DELETE FROM TrackedUsers WHERE username = :username", query_params)?;

    tx.commit()?;

    if removed > 0 {
        log::info!("User {username} has been removed from the database.");
    }
    Ok(removed > 0)
}

/////*============== MEMBERSHIP QUERIES ==============*/
/// Adds a tracked user to `room`.
/// Returns `true` if it was newly added, false if already a member or not tracked.
pub fn insert_membership(connection: &Connection, room: &str, username: &str) -> DBResult<bool> {
    log::trace!("[insert_membership] Adding {username} to room '{room}'...");

    let query_params = rusqlite::named_params! { ":room": room, ":username": username };

    connection
        .prepare(
            "INSERT INTO Memberships (room, user_id)
             SELECT :room, id FROM TrackedUsers WHERE username = :username",
        )?
        .execute(query_params)
        .map_or_else(swallow_constraint_violation, |inserted| Ok(inserted > 0))
}

/// Removes a user from `room`. Returns `true` if they were a member.
pub fn delete_membership(connection: &Connection, room: &str, username: &str) -> DBResult<bool> {
    let query_params = rusqlite::named_params! { ":room": room, ":username": username };

    let removed = connection
        .prepare(
            "DELETE FROM Memberships
             WHERE room = :room
               AND user_id IN (SELECT id FROM TrackedUsers WHERE username = :username)",
        )?
        .execute(query_params)?;

    Ok(removed > 0)
}
