use rusqlite::Connection;

use crate::error::Result;

/// Initialise the report schema in `conn`.
///
/// Idempotent. `schedule.next_report_time` is indexed for the overdue poll.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schedule (
            id                TEXT    NOT NULL PRIMARY KEY,
            interval          INTEGER NOT NULL DEFAULT 0,  -- 0 daily … 5 yearly
            next_report_time  INTEGER NOT NULL DEFAULT 0,  -- Unix seconds
            name              TEXT    NOT NULL,
            description       TEXT    NOT NULL DEFAULT '',
            lookback          INTEGER NOT NULL DEFAULT 0,  -- seconds
            report_group_id   TEXT    NOT NULL DEFAULT '',
            time              TEXT    NOT NULL DEFAULT '',  -- HH:MM
            day               INTEGER NOT NULL DEFAULT 0,
            date_format       TEXT    NOT NULL DEFAULT '',
            date_position     TEXT    NOT NULL DEFAULT ''
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_schedule_next_report_time
            ON schedule (next_report_time);

        CREATE TABLE IF NOT EXISTS report_content (
            id            TEXT    NOT NULL PRIMARY KEY,
            schedule_id   TEXT    NOT NULL REFERENCES schedule (id) ON DELETE CASCADE,
            position      INTEGER NOT NULL,
            panel_id      INTEGER NOT NULL,
            dashboard_id  TEXT    NOT NULL,
            title         TEXT    NOT NULL,
            raw_sql       TEXT    NOT NULL,
            variables     TEXT    NOT NULL DEFAULT '{}'  -- JSON: name -> [options]
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_report_content_schedule
            ON report_content (schedule_id, position);

        CREATE TABLE IF NOT EXISTS dashboard_variable (
            dashboard_id  TEXT NOT NULL,
            name          TEXT NOT NULL,
            definition    TEXT NOT NULL,
            PRIMARY KEY (dashboard_id, name)
        ) STRICT;

        CREATE TABLE IF NOT EXISTS report_group_member (
            report_group_id  TEXT NOT NULL,
            email            TEXT NOT NULL,
            PRIMARY KEY (report_group_id, email)
        ) STRICT;
        ",
    )?;
    Ok(())
}
