pub const TRACKED_USERS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS TrackedUsers (
        id             INTEGER     PRIMARY KEY AUTOINCREMENT,
        username       TEXT        NOT NULL,
        joined_date    INTEGER     NOT NULL,

        UNIQUE(username)
    )";

pub const MEMBERSHIPS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS Memberships (
        room           TEXT        NOT NULL,
        user_id        INTEGER     NOT NULL    REFERENCES TrackedUsers(id),

        UNIQUE(room, user_id)
    )";

pub const STATS_CACHE_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS StatsCache (
        username       TEXT        PRIMARY KEY,
        data           TEXT        NOT NULL,
        updated_at     INTEGER     NOT NULL
    )";

pub const ALL_SCHEMAS: [&str; 3] = [TRACKED_USERS_SCHEMA, MEMBERSHIPS_SCHEMA, STATS_CACHE_SCHEMA];
