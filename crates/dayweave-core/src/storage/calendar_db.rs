//! SQLite-backed [`CalendarStore`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::data_dir;
use super::migrations;
use super::store::CalendarStore;
use crate::calendar::{
    Event, EventId, EventStatus, FocusPreference, Location, NewEvent, NewTask, Task, TaskId,
    TaskStatus, User, UserId,
};
use crate::error::{CoreError, DatabaseError, Result};
use crate::travel::{SegmentPlan, TravelTime};

const EVENT_COLUMNS: &str = "id, uid, user_id, summary, start_at, end_at, location_label, address,
    latitude, longitude, status, category, subcategory, transport_mode, origin_event_id,
    created_at, updated_at";

const TASK_COLUMNS: &str =
    "id, user_id, assignee_id, name, estimated_minutes, priority, status, event_id, created_at";

const SEGMENT_COLUMNS: &str = "id, user_id, from_event_id, to_event_id, start_at, end_at,
    duration_minutes, distance_km, mode";

// === Helper Functions ===

/// Format an instant for storage. Fixed precision keeps text order chronological.
fn format_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_ts(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp '{raw}': {e}")))
}

/// Parse a text column through `FromStr`.
fn parse_col<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, e))
}

fn parse_opt_col<T>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse::<T>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_ts(row, 2)?,
    })
}

fn row_to_preference(row: &Row) -> rusqlite::Result<FocusPreference> {
    Ok(FocusPreference {
        user_id: row.get(0)?,
        min_focus_minutes: row.get(1)?,
        max_events_per_day: row.get(2)?,
        preferred_period: parse_opt_col(row, 3)?,
    })
}

fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let label: Option<String> = row.get(6)?;
    let address: Option<String> = row.get(7)?;
    let latitude: Option<f64> = row.get(8)?;
    let longitude: Option<f64> = row.get(9)?;
    let location = if address.is_some() || latitude.is_some() || longitude.is_some() {
        Some(Location {
            label,
            address,
            latitude,
            longitude,
        })
    } else {
        None
    };

    Ok(Event {
        id: row.get(0)?,
        uid: row.get(1)?,
        user_id: row.get(2)?,
        summary: row.get(3)?,
        start: parse_ts(row, 4)?,
        end: parse_ts(row, 5)?,
        location,
        status: parse_col(row, 10)?,
        category: parse_col(row, 11)?,
        subcategory: parse_opt_col(row, 12)?,
        transport_mode: parse_opt_col(row, 13)?,
        origin_event_id: row.get(14)?,
        created_at: parse_ts(row, 15)?,
        updated_at: parse_ts(row, 16)?,
    })
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        assignee_id: row.get(2)?,
        name: row.get(3)?,
        estimated_minutes: row.get(4)?,
        priority: row.get(5)?,
        status: parse_col::<TaskStatus>(row, 6)?,
        event_id: row.get(7)?,
        created_at: parse_ts(row, 8)?,
    })
}

fn row_to_segment(row: &Row) -> rusqlite::Result<TravelTime> {
    Ok(TravelTime {
        id: row.get(0)?,
        user_id: row.get(1)?,
        from_event_id: row.get(2)?,
        to_event_id: row.get(3)?,
        start: parse_ts(row, 4)?,
        end: parse_ts(row, 5)?,
        duration_minutes: row.get(6)?,
        distance_km: row.get(7)?,
        mode: parse_col(row, 8)?,
    })
}

fn fetch_event(conn: &Connection, id: EventId) -> Result<Option<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_event).optional()?)
}

fn fetch_task(conn: &Connection, id: TaskId) -> Result<Option<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_task).optional()?)
}

fn fetch_segment(conn: &Connection, from: EventId, to: EventId) -> Result<Option<TravelTime>> {
    let sql = format!(
        "SELECT {SEGMENT_COLUMNS} FROM travel_times WHERE from_event_id = ?1 AND to_event_id = ?2"
    );
    Ok(conn.query_row(&sql, params![from, to], row_to_segment).optional()?)
}

fn insert_event_row(
    conn: &Connection,
    event: &NewEvent,
    origin_event_id: Option<EventId>,
) -> Result<Event> {
    let now = format_ts(Utc::now());
    let location = event.location.as_ref();
    conn.execute(
        "INSERT INTO events (uid, user_id, summary, start_at, end_at, location_label, address,
            latitude, longitude, status, category, subcategory, transport_mode, origin_event_id,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
        params![
            Uuid::new_v4().to_string(),
            event.user_id,
            event.summary,
            format_ts(event.start),
            format_ts(event.end),
            location.and_then(|l| l.label.clone()),
            location.and_then(|l| l.address.clone()),
            location.and_then(|l| l.latitude),
            location.and_then(|l| l.longitude),
            EventStatus::Planned.as_str(),
            event.category.as_str(),
            event.subcategory.map(|s| s.as_str()),
            event.transport_mode.map(|m| m.as_str()),
            origin_event_id,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    fetch_event(conn, id)?.ok_or_else(|| CoreError::not_found("event", id))
}

fn write_status(conn: &Connection, id: EventId, status: EventStatus) -> Result<()> {
    let changed = conn.execute(
        "UPDATE events SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), format_ts(Utc::now()), id],
    )?;
    if changed == 0 {
        return Err(CoreError::not_found("event", id));
    }
    Ok(())
}

fn insert_segment_row(conn: &Connection, segment: &TravelTime) -> Result<()> {
    conn.execute(
        "INSERT INTO travel_times (user_id, from_event_id, to_event_id, start_at, end_at,
            duration_minutes, distance_km, mode)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(from_event_id, to_event_id) DO UPDATE SET
            user_id = excluded.user_id,
            start_at = excluded.start_at,
            end_at = excluded.end_at,
            duration_minutes = excluded.duration_minutes,
            distance_km = excluded.distance_km,
            mode = excluded.mode",
        params![
            segment.user_id,
            segment.from_event_id,
            segment.to_event_id,
            format_ts(segment.start),
            format_ts(segment.end),
            segment.duration_minutes,
            segment.distance_km,
            segment.mode.as_str(),
        ],
    )?;
    Ok(())
}

fn query_list<T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    map: fn(&Row) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// SQLite store for users, events, tasks and travel segments.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open the store at `<data_dir>/dayweave.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("dayweave.db");
        Self::open_path(path)
    }

    /// Open (creating if needed) the database file at `path`.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        Self::init(conn, Some(path))
    }

    /// Open an in-memory database (tests, dry runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        tracing::debug!(path = ?path, "calendar store ready");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned.into())
    }

    /// Run `f` inside `BEGIN IMMEDIATE`; roll back on any error.
    fn transactional<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f(&conn) {
            Ok(value) => {
                conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(err) => {
                let _ = conn.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }
}

impl CalendarStore for SqliteStore {
    fn insert_user(&self, name: &str) -> Result<User> {
        let conn = self.lock()?;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO users (name, created_at) VALUES (?1, ?2)",
            params![name, format_ts(created_at)],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            "SELECT id, name, created_at FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )?)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()?)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        query_list(&conn, "SELECT id, name, created_at FROM users ORDER BY id", [], row_to_user)
    }

    fn get_preference(&self, user_id: UserId) -> Result<Option<FocusPreference>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT user_id, min_focus_minutes, max_events_per_day, preferred_period
                 FROM user_preferences WHERE user_id = ?1",
                params![user_id],
                row_to_preference,
            )
            .optional()?)
    }

    fn upsert_preference(&self, preference: &FocusPreference) -> Result<FocusPreference> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO user_preferences (user_id, min_focus_minutes, max_events_per_day, preferred_period)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                min_focus_minutes = excluded.min_focus_minutes,
                max_events_per_day = excluded.max_events_per_day,
                preferred_period = excluded.preferred_period",
            params![
                preference.user_id,
                preference.min_focus_minutes,
                preference.max_events_per_day,
                preference.preferred_period.map(|p| p.as_str()),
            ],
        )?;
        Ok(conn.query_row(
            "SELECT user_id, min_focus_minutes, max_events_per_day, preferred_period
             FROM user_preferences WHERE user_id = ?1",
            params![preference.user_id],
            row_to_preference,
        )?)
    }

    fn insert_event(&self, event: &NewEvent, origin_event_id: Option<EventId>) -> Result<Event> {
        let conn = self.lock()?;
        insert_event_row(&conn, event, origin_event_id)
    }

    fn update_event(&self, event: &Event) -> Result<Event> {
        let conn = self.lock()?;
        let location = event.location.as_ref();
        let changed = conn.execute(
            "UPDATE events SET summary = ?1, start_at = ?2, end_at = ?3, location_label = ?4,
                address = ?5, latitude = ?6, longitude = ?7, status = ?8, category = ?9,
                subcategory = ?10, transport_mode = ?11, updated_at = ?12
             WHERE id = ?13",
            params![
                event.summary,
                format_ts(event.start),
                format_ts(event.end),
                location.and_then(|l| l.label.clone()),
                location.and_then(|l| l.address.clone()),
                location.and_then(|l| l.latitude),
                location.and_then(|l| l.longitude),
                event.status.as_str(),
                event.category.as_str(),
                event.subcategory.map(|s| s.as_str()),
                event.transport_mode.map(|m| m.as_str()),
                format_ts(Utc::now()),
                event.id,
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("event", event.id));
        }
        fetch_event(&conn, event.id)?.ok_or_else(|| CoreError::not_found("event", event.id))
    }

    fn get_event(&self, id: EventId) -> Result<Option<Event>> {
        let conn = self.lock()?;
        fetch_event(&conn, id)
    }

    fn events_for_user(&self, user_id: UserId, include_cancelled: bool) -> Result<Vec<Event>> {
        let conn = self.lock()?;
        let filter = if include_cancelled {
            ""
        } else {
            "AND status NOT IN ('CANCELLED', 'PENDING_DELETION')"
        };
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1 {filter} ORDER BY start_at, id"
        );
        query_list(&conn, &sql, params![user_id], row_to_event)
    }

    fn events_overlapping(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE user_id = ?1 AND start_at < ?3 AND end_at > ?2
             ORDER BY start_at, id"
        );
        query_list(
            &conn,
            &sql,
            params![user_id, format_ts(start), format_ts(end)],
            row_to_event,
        )
    }

    fn find_by_origin(&self, origin_event_id: EventId) -> Result<Option<Event>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE origin_event_id = ?1");
        Ok(conn
            .query_row(&sql, params![origin_event_id], row_to_event)
            .optional()?)
    }

    fn set_event_status(&self, id: EventId, status: EventStatus) -> Result<()> {
        let conn = self.lock()?;
        write_status(&conn, id, status)
    }

    fn get_segment(&self, from_event_id: EventId, to_event_id: EventId) -> Result<Option<TravelTime>> {
        let conn = self.lock()?;
        fetch_segment(&conn, from_event_id, to_event_id)
    }

    fn segments_for_user(&self, user_id: UserId) -> Result<Vec<TravelTime>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {SEGMENT_COLUMNS} FROM travel_times WHERE user_id = ?1 ORDER BY start_at, id"
        );
        query_list(&conn, &sql, params![user_id], row_to_segment)
    }

    fn segments_overlapping(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TravelTime>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {SEGMENT_COLUMNS} FROM travel_times
             WHERE user_id = ?1 AND start_at < ?3 AND end_at > ?2
             ORDER BY start_at, id"
        );
        query_list(
            &conn,
            &sql,
            params![user_id, format_ts(start), format_ts(end)],
            row_to_segment,
        )
    }

    fn upsert_segment(&self, segment: &TravelTime) -> Result<TravelTime> {
        let conn = self.lock()?;
        insert_segment_row(&conn, segment)?;
        fetch_segment(&conn, segment.from_event_id, segment.to_event_id)?
            .ok_or_else(|| CoreError::not_found("travel segment", segment.from_event_id))
    }

    fn apply_segment_plan(&self, plan: &SegmentPlan) -> Result<()> {
        if !plan.has_writes() {
            return Ok(());
        }
        self.transactional(|conn| {
            for stale in &plan.delete {
                conn.execute("DELETE FROM travel_times WHERE id = ?1", params![stale.id])?;
            }
            for segment in plan.update.iter().chain(plan.create.iter()) {
                insert_segment_row(conn, segment)?;
            }
            Ok(())
        })
    }

    fn insert_task(&self, task: &NewTask) -> Result<Task> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (user_id, assignee_id, name, estimated_minutes, priority, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.user_id,
                task.assignee_id,
                task.name,
                task.estimated_minutes,
                task.priority,
                TaskStatus::PendingCreation.as_str(),
                format_ts(Utc::now()),
            ],
        )?;
        let id = conn.last_insert_rowid();
        fetch_task(&conn, id)?.ok_or_else(|| CoreError::not_found("task", id))
    }

    fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        let conn = self.lock()?;
        fetch_task(&conn, id)
    }

    fn tasks_for_user(&self, user_id: UserId) -> Result<Vec<Task>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY id");
        query_list(&conn, &sql, params![user_id], row_to_task)
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE tasks SET assignee_id = ?1, name = ?2, estimated_minutes = ?3, priority = ?4,
                status = ?5, event_id = ?6
             WHERE id = ?7",
            params![
                task.assignee_id,
                task.name,
                task.estimated_minutes,
                task.priority,
                task.status.as_str(),
                task.event_id,
                task.id,
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("task", task.id));
        }
        Ok(())
    }

    fn commit_reshuffle(
        &self,
        original_id: EventId,
        replacement: Option<(&NewEvent, TaskId)>,
    ) -> Result<Option<Event>> {
        self.transactional(|conn| {
            let created = match replacement {
                Some((event, task_id)) => {
                    let created = insert_event_row(conn, event, Some(original_id))?;
                    let changed = conn.execute(
                        "UPDATE tasks SET event_id = ?1, status = ?2 WHERE id = ?3",
                        params![created.id, TaskStatus::Scheduled.as_str(), task_id],
                    )?;
                    if changed == 0 {
                        return Err(CoreError::not_found("task", task_id));
                    }
                    Some(created)
                }
                None => None,
            };
            write_status(conn, original_id, EventStatus::Cancelled)?;
            Ok(created)
        })
    }
}
