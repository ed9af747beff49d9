use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeZone};
use ereport_core::{IntervalKind, PanelQuery, Schedule, VariableDefinition};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

use crate::db::init_db;
use crate::error::{Result, SchedulerError};
use crate::recurrence::next_report_time;

/// Persistence the report engine needs.
pub trait ReportStore: Send + Sync {
    /// Schedules whose `next_report_time` is before `now` (Unix seconds).
    fn overdue_schedules(&self, now: i64) -> Result<Vec<Schedule>>;

    fn schedule(&self, id: &str) -> Result<Schedule>;

    /// Panels of a schedule, in sheet order.
    fn panel_queries(&self, schedule_id: &str) -> Result<Vec<PanelQuery>>;

    fn variable_definitions(&self, dashboard_id: &str) -> Result<Vec<VariableDefinition>>;

    /// Email addresses of a report group's members.
    fn recipients(&self, report_group_id: &str) -> Result<Vec<String>>;

    fn update_next_report_time(&self, schedule_id: &str, next: i64) -> Result<()>;
}

const SCHEDULE_COLUMNS: &str = "id, interval, next_report_time, name, description, lookback,
     report_group_id, time, day, date_format, date_position";

/// SQLite-backed [`ReportStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap `conn`, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a schedule together with its panels.
    ///
    /// A schedule without an id gets a fresh one. `next_report_time` is always
    /// recomputed from `now`, and existing panels are replaced by `panels`.
    pub fn save_schedule<Tz: TimeZone>(
        &self,
        mut schedule: Schedule,
        panels: &[PanelQuery],
        now: &DateTime<Tz>,
    ) -> Result<Schedule> {
        if schedule.id.is_empty() {
            schedule.id = Uuid::new_v4().to_string();
        }
        schedule.next_report_time = next_report_time(&schedule, now);

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO schedule
             (id, interval, next_report_time, name, description, lookback,
              report_group_id, time, day, date_format, date_position)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
             ON CONFLICT (id) DO UPDATE SET
               interval = excluded.interval,
               next_report_time = excluded.next_report_time,
               name = excluded.name,
               description = excluded.description,
               lookback = excluded.lookback,
               report_group_id = excluded.report_group_id,
               time = excluded.time,
               day = excluded.day,
               date_format = excluded.date_format,
               date_position = excluded.date_position",
            params![
                schedule.id,
                schedule.interval.code(),
                schedule.next_report_time,
                schedule.name,
                schedule.description,
                schedule.lookback,
                schedule.report_group_id,
                schedule.time,
                schedule.day,
                schedule.date_format,
                schedule.date_position,
            ],
        )?;
        tx.execute(
            "DELETE FROM report_content WHERE schedule_id = ?1",
            [&schedule.id],
        )?;
        for (position, panel) in panels.iter().enumerate() {
            tx.execute(
                "INSERT INTO report_content
                 (id, schedule_id, position, panel_id, dashboard_id, title, raw_sql, variables)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                params![
                    Uuid::new_v4().to_string(),
                    schedule.id,
                    position as i64,
                    panel.panel_id,
                    panel.dashboard_id,
                    panel.title,
                    panel.raw_sql,
                    panel.variables,
                ],
            )?;
        }
        tx.commit()?;

        info!(
            schedule_id = %schedule.id,
            name = %schedule.name,
            interval = %schedule.interval,
            next_report_time = schedule.next_report_time,
            panels = panels.len(),
            "schedule saved"
        );
        Ok(schedule)
    }

    /// Every schedule, by name.
    pub fn list_schedules(&self) -> Result<Vec<Schedule>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedule ORDER BY name, id"
        ))?;
        let schedules = stmt
            .query_map([], schedule_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schedules)
    }

    /// Remove a schedule and its panels.
    pub fn delete_schedule(&self, id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM report_content WHERE schedule_id = ?1", [id])?;
        let n = tx.execute("DELETE FROM schedule WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(SchedulerError::ScheduleNotFound { id: id.to_string() });
        }
        tx.commit()?;
        info!(schedule_id = %id, "schedule deleted");
        Ok(())
    }

    pub fn set_variable_definition(
        &self,
        dashboard_id: &str,
        variable: &VariableDefinition,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO dashboard_variable (dashboard_id, name, definition)
             VALUES (?1,?2,?3)
             ON CONFLICT (dashboard_id, name) DO UPDATE SET definition = excluded.definition",
            params![dashboard_id, variable.name, variable.definition],
        )?;
        Ok(())
    }

    pub fn add_group_member(&self, report_group_id: &str, email: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO report_group_member (report_group_id, email) VALUES (?1,?2)",
            params![report_group_id, email],
        )?;
        Ok(())
    }
}

impl ReportStore for SqliteStore {
    fn overdue_schedules(&self, now: i64) -> Result<Vec<Schedule>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedule
             WHERE next_report_time < ?1
             ORDER BY next_report_time, id"
        ))?;
        let schedules = stmt
            .query_map([now], schedule_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(schedules)
    }

    fn schedule(&self, id: &str) -> Result<Schedule> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SCHEDULE_COLUMNS} FROM schedule WHERE id = ?1"),
            [id],
            schedule_from_row,
        )
        .optional()?
        .ok_or_else(|| SchedulerError::ScheduleNotFound { id: id.to_string() })
    }

    fn panel_queries(&self, schedule_id: &str) -> Result<Vec<PanelQuery>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT schedule_id, panel_id, dashboard_id, title, raw_sql, variables
             FROM report_content WHERE schedule_id = ?1 ORDER BY position",
        )?;
        let panels = stmt
            .query_map([schedule_id], |row| {
                Ok(PanelQuery {
                    schedule_id: row.get(0)?,
                    panel_id: row.get(1)?,
                    dashboard_id: row.get(2)?,
                    title: row.get(3)?,
                    raw_sql: row.get(4)?,
                    variables: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(panels)
    }

    fn variable_definitions(&self, dashboard_id: &str) -> Result<Vec<VariableDefinition>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT name, definition FROM dashboard_variable
             WHERE dashboard_id = ?1 ORDER BY name",
        )?;
        let variables = stmt
            .query_map([dashboard_id], |row| {
                Ok(VariableDefinition::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(variables)
    }

    fn recipients(&self, report_group_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT email FROM report_group_member
             WHERE report_group_id = ?1 ORDER BY email",
        )?;
        let emails = stmt
            .query_map([report_group_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(emails)
    }

    fn update_next_report_time(&self, schedule_id: &str, next: i64) -> Result<()> {
        let n = self.conn().execute(
            "UPDATE schedule SET next_report_time = ?1 WHERE id = ?2",
            params![next, schedule_id],
        )?;
        if n == 0 {
            return Err(SchedulerError::ScheduleNotFound {
                id: schedule_id.to_string(),
            });
        }
        Ok(())
    }
}

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<Schedule> {
    Ok(Schedule {
        id: row.get(0)?,
        interval: IntervalKind::from_code(row.get(1)?),
        next_report_time: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        lookback: row.get(5)?,
        report_group_id: row.get(6)?,
        time: row.get(7)?,
        day: row.get(8)?,
        date_format: row.get(9)?,
        date_position: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn store() -> SqliteStore {
        SqliteStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn schedule(name: &str) -> Schedule {
        Schedule {
            id: String::new(),
            interval: IntervalKind::Daily,
            day: 0,
            time: "09:00".into(),
            next_report_time: 0,
            lookback: 3_600,
            name: name.into(),
            description: "desc".into(),
            report_group_id: "g1".into(),
            date_format: String::new(),
            date_position: String::new(),
        }
    }

    fn panel(title: &str) -> PanelQuery {
        PanelQuery {
            schedule_id: String::new(),
            panel_id: 2,
            dashboard_id: "dash".into(),
            title: title.into(),
            raw_sql: "SELECT 1".into(),
            variables: "{}".into(),
        }
    }

    #[test]
    fn save_assigns_id_and_next_time() {
        let store = store();
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap();
        let saved = store
            .save_schedule(schedule("Stock"), &[panel("B"), panel("A")], &now)
            .unwrap();
        assert!(!saved.id.is_empty());
        assert_eq!(
            saved.next_report_time,
            Utc.with_ymd_and_hms(2024, 5, 16, 9, 0, 0).unwrap().timestamp()
        );
        assert_eq!(store.schedule(&saved.id).unwrap(), saved);

        let titles: Vec<String> = store
            .panel_queries(&saved.id)
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn save_replaces_existing_panels() {
        let store = store();
        let now = Utc::now();
        let saved = store
            .save_schedule(schedule("Stock"), &[panel("A"), panel("B")], &now)
            .unwrap();
        let mut edited = saved.clone();
        edited.name = "Stock levels".into();
        store.save_schedule(edited, &[panel("C")], &now).unwrap();

        assert_eq!(store.schedule(&saved.id).unwrap().name, "Stock levels");
        let panels = store.panel_queries(&saved.id).unwrap();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].schedule_id, saved.id);
    }

    #[test]
    fn overdue_is_strictly_before_now() {
        let store = store();
        let now = Utc::now();
        let a = store.save_schedule(schedule("a"), &[], &now).unwrap();
        let b = store.save_schedule(schedule("b"), &[], &now).unwrap();
        store.update_next_report_time(&a.id, 100).unwrap();
        store.update_next_report_time(&b.id, 200).unwrap();

        let ids = |now| -> Vec<String> {
            store
                .overdue_schedules(now)
                .unwrap()
                .into_iter()
                .map(|s| s.id)
                .collect()
        };
        assert!(ids(100).is_empty());
        assert_eq!(ids(200), vec![a.id.clone()]);
        assert_eq!(ids(201), vec![a.id.clone(), b.id.clone()]);
    }

    #[test]
    fn unknown_schedule_is_not_found() {
        let store = store();
        assert!(matches!(
            store.schedule("nope"),
            Err(SchedulerError::ScheduleNotFound { .. })
        ));
        assert!(matches!(
            store.update_next_report_time("nope", 1),
            Err(SchedulerError::ScheduleNotFound { .. })
        ));
        assert!(matches!(
            store.delete_schedule("nope"),
            Err(SchedulerError::ScheduleNotFound { .. })
        ));
    }

    #[test]
    fn delete_removes_panels() {
        let store = store();
        let saved = store
            .save_schedule(schedule("x"), &[panel("A")], &Utc::now())
            .unwrap();
        store.delete_schedule(&saved.id).unwrap();
        assert!(store.panel_queries(&saved.id).unwrap().is_empty());
    }

    #[test]
    fn list_is_ordered_by_name() {
        let store = store();
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap();
        assert!(store.list_schedules().unwrap().is_empty());
        store.save_schedule(schedule("Sales"), &[], &now).unwrap();
        store.save_schedule(schedule("Expiry"), &[], &now).unwrap();

        let names: Vec<String> = store
            .list_schedules()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Expiry".to_string(), "Sales".to_string()]);
    }

    #[test]
    fn variables_and_recipients() {
        let store = store();
        store
            .set_variable_definition("dash", &VariableDefinition::new("store", "'main'"))
            .unwrap();
        store
            .set_variable_definition("dash", &VariableDefinition::new("store", "'north'"))
            .unwrap();
        store
            .set_variable_definition("other", &VariableDefinition::new("item", "1"))
            .unwrap();
        assert_eq!(
            store.variable_definitions("dash").unwrap(),
            vec![VariableDefinition::new("store", "'north'")]
        );

        store.add_group_member("g1", "b@example.com").unwrap();
        store.add_group_member("g1", "a@example.com").unwrap();
        store.add_group_member("g1", "a@example.com").unwrap();
        store.add_group_member("g2", "c@example.com").unwrap();
        assert_eq!(
            store.recipients("g1").unwrap(),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
        assert!(store.recipients("none").unwrap().is_empty());
    }
}
