use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use sha2::{Digest, Sha256};

use crate::error::PipelineError;
use crate::models::{DraftEvent, Event, EventQuery, EventStatus, TicketInterest};
use crate::utils::{self, from_db_time, to_db_time};

const EVENT_COLUMNS: &str = "id, title, date_time, venue_name, venue_address, city, description,
    category, image_url, source_website, original_url, last_scraped_at, status, imported_at,
    imported_by, import_notes, created_at, updated_at";

/// What reconciling one draft did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// First sighting of the identity key.
    Created,
    /// Title, start time or venue moved.
    Changed,
    /// Matched an existing record with no tracked-field drift.
    Refreshed,
}

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        utils::ensure_parent(path);
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> rusqlite::Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves SQLite consistent, so a poisoned lock is still usable.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.lock().execute_batch(
            "CREATE TABLE IF NOT EXISTS events(
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                date_time TEXT NOT NULL,
                venue_name TEXT,
                venue_address TEXT,
                city TEXT NOT NULL,
                description TEXT,
                category TEXT NOT NULL DEFAULT '[]',
                image_url TEXT,
                source_website TEXT NOT NULL,
                original_url TEXT NOT NULL,
                last_scraped_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'new',
                imported_at TEXT,
                imported_by TEXT,
                import_notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(original_url, title)
            );
            CREATE INDEX IF NOT EXISTS idx_events_city ON events(city);
            CREATE INDEX IF NOT EXISTS idx_events_date_time ON events(date_time);
            CREATE INDEX IF NOT EXISTS idx_events_status ON events(status);
            CREATE TABLE IF NOT EXISTS ticket_interests(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL,
                event_id TEXT NOT NULL REFERENCES events(id),
                opt_in INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_ticket_interests_event ON ticket_interests(event_id);",
        )?;
        Ok(())
    }

    /// Merges one draft into the catalog.
    ///
    /// Lookup and write happen in a single immediate transaction keyed on
    /// `(original_url, title)`, so overlapping runs cannot create duplicates.
    /// Matched records always take the draft's title, start, venue, address,
    /// description, image and scrape time; the status only moves to `updated`
    /// when a tracked field changed and the record is not `imported`.
    pub fn reconcile(
        &self,
        draft: &DraftEvent,
        now: DateTime<Utc>,
    ) -> rusqlite::Result<ReconcileOutcome> {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = tx
            .query_row(
                "SELECT id, title, date_time, venue_name, status FROM events
                 WHERE original_url = ?1 AND title = ?2",
                params![draft.original_url, draft.title],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        status_column(row, 4)?,
                    ))
                },
            )
            .optional()?;

        let now_text = to_db_time(&now);
        let date_text = to_db_time(&draft.date_time);

        let outcome = match existing {
            None => {
                let category = category_json(&draft.category)?;
                tx.execute(
                    "INSERT INTO events (id, title, date_time, venue_name, venue_address, city,
                        description, category, image_url, source_website, original_url,
                        last_scraped_at, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
                    params![
                        event_id(&draft.original_url, &draft.title),
                        draft.title,
                        date_text,
                        draft.venue_name,
                        draft.venue_address,
                        draft.city,
                        draft.description,
                        category,
                        draft.image_url,
                        draft.source_website,
                        draft.original_url,
                        to_db_time(&draft.last_scraped_at),
                        EventStatus::New.as_str(),
                        now_text,
                    ],
                )?;
                ReconcileOutcome::Created
            }
            Some((id, stored_title, stored_date, stored_venue, status)) => {
                let changed = stored_title != draft.title
                    || stored_date != date_text
                    || stored_venue != draft.venue_name;
                let next_status = if changed && status != EventStatus::Imported {
                    EventStatus::Updated
                } else {
                    status
                };
                tx.execute(
                    "UPDATE events SET title = ?2, date_time = ?3, venue_name = ?4,
                        venue_address = ?5, description = ?6, image_url = ?7,
                        last_scraped_at = ?8, status = ?9, updated_at = ?10
                     WHERE id = ?1",
                    params![
                        id,
                        draft.title,
                        date_text,
                        draft.venue_name,
                        draft.venue_address,
                        draft.description,
                        draft.image_url,
                        to_db_time(&draft.last_scraped_at),
                        next_status.as_str(),
                        now_text,
                    ],
                )?;
                if changed {
                    ReconcileOutcome::Changed
                } else {
                    ReconcileOutcome::Refreshed
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Marks every past, non-imported event as `inactive`. Returns how many
    /// records transitioned.
    pub fn sweep_stale(&self, now: DateTime<Utc>) -> rusqlite::Result<usize> {
        self.lock().execute(
            "UPDATE events SET status = ?2, updated_at = ?1
             WHERE date_time < ?1 AND status NOT IN (?2, ?3)",
            params![
                to_db_time(&now),
                EventStatus::Inactive.as_str(),
                EventStatus::Imported.as_str(),
            ],
        )
    }

    /// Operator action: pins the event as `imported` with notes.
    pub fn import_event(
        &self,
        id: &str,
        imported_by: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Event, PipelineError> {
        let conn = self.lock();
        let now_text = to_db_time(&now);
        let affected = conn.execute(
            "UPDATE events SET status = ?2, imported_at = ?3, imported_by = ?4,
                import_notes = ?5, updated_at = ?3
             WHERE id = ?1",
            params![
                id,
                EventStatus::Imported.as_str(),
                now_text,
                imported_by,
                notes.unwrap_or_default(),
            ],
        )?;
        if affected == 0 {
            return Err(PipelineError::NotFound(id.to_string()));
        }
        fetch_event(&conn, id)?.ok_or_else(|| PipelineError::NotFound(id.to_string()))
    }

    /// Records a visitor's interest in tickets for an existing event.
    pub fn record_ticket_interest(
        &self,
        email: &str,
        event_id: &str,
        opt_in: bool,
        now: DateTime<Utc>,
    ) -> Result<TicketInterest, PipelineError> {
        let conn = self.lock();
        let known = conn
            .query_row("SELECT 1 FROM events WHERE id = ?1", params![event_id], |_| Ok(()))
            .optional()?;
        if known.is_none() {
            return Err(PipelineError::NotFound(event_id.to_string()));
        }
        conn.execute(
            "INSERT INTO ticket_interests (email, event_id, opt_in, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![email, event_id, opt_in, to_db_time(&now)],
        )?;
        Ok(TicketInterest {
            id: conn.last_insert_rowid(),
            email: email.to_string(),
            event_id: event_id.to_string(),
            opt_in,
            created_at: now,
        })
    }

    pub fn get_event(&self, id: &str) -> rusqlite::Result<Option<Event>> {
        fetch_event(&self.lock(), id)
    }

    pub fn find_by_identity(
        &self,
        original_url: &str,
        title: &str,
    ) -> rusqlite::Result<Option<Event>> {
        let conn = self.lock();
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE original_url = ?1 AND title = ?2");
        conn.query_row(&sql, params![original_url, title], event_from_row)
            .optional()
    }

    pub fn list_events(
        &self,
        query: &EventQuery,
        now: DateTime<Utc>,
    ) -> rusqlite::Result<Vec<Event>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(city) = query.city.as_deref().filter(|c| !c.trim().is_empty()) {
            clauses.push("city LIKE ? ESCAPE '\\'");
            values.push(Value::Text(like_pattern(city)));
        }
        if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.trim().is_empty()) {
            clauses.push(
                "(title LIKE ? ESCAPE '\\' OR venue_name LIKE ? ESCAPE '\\'
                  OR description LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(keyword);
            for _ in 0..3 {
                values.push(Value::Text(pattern.clone()));
            }
        }
        if let Some(from) = query.date_from {
            clauses.push("date_time >= ?");
            values.push(Value::Text(to_db_time(&from)));
        }
        if let Some(to) = query.date_to {
            clauses.push("date_time <= ?");
            values.push(Value::Text(to_db_time(&to)));
        }
        if let Some(status) = query.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if query.upcoming {
            clauses.push("date_time >= ? AND status != ?");
            values.push(Value::Text(to_db_time(&now)));
            values.push(Value::Text(EventStatus::Inactive.as_str().to_string()));
        }

        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY date_time ASC, title ASC");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(i64::from(limit)));
        }

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), event_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn count_events(&self) -> rusqlite::Result<usize> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

/// Stable record id derived from the identity key. The URL is length-prefixed
/// so no two distinct `(original_url, title)` pairs hash the same input.
pub fn event_id(original_url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((original_url.len() as u64).to_be_bytes());
    hasher.update(original_url.as_bytes());
    hasher.update(title.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn fetch_event(conn: &Connection, id: &str) -> rusqlite::Result<Option<Event>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
    conn.query_row(&sql, params![id], event_from_row).optional()
}

fn like_pattern(value: &str) -> String {
    let escaped = value
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn category_json(category: &[String]) -> rusqlite::Result<String> {
    serde_json::to_string(category).map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

#[derive(Debug, thiserror::Error)]
#[error("invalid timestamp: {0}")]
struct InvalidTimestamp(String);

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    from_db_time(&text).ok_or_else(|| conversion_error(idx, InvalidTimestamp(text)))
}

fn optional_time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    match text {
        Some(text) => from_db_time(&text)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, InvalidTimestamp(text))),
        None => Ok(None),
    }
}

fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<EventStatus> {
    let text: String = row.get(idx)?;
    EventStatus::from_str(&text).map_err(|err| conversion_error(idx, err))
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let category_text: String = row.get(7)?;
    let category: Vec<String> =
        serde_json::from_str(&category_text).map_err(|err| conversion_error(7, err))?;
    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        date_time: time_column(row, 2)?,
        venue_name: row.get(3)?,
        venue_address: row.get(4)?,
        city: row.get(5)?,
        description: row.get(6)?,
        category,
        image_url: row.get(8)?,
        source_website: row.get(9)?,
        original_url: row.get(10)?,
        last_scraped_at: time_column(row, 11)?,
        status: status_column(row, 12)?,
        imported_at: optional_time_column(row, 13)?,
        imported_by: row.get(14)?,
        import_notes: row.get(15)?,
        created_at: time_column(row, 16)?,
        updated_at: time_column(row, 17)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SubsecRound, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 14, 9, 0, 0).unwrap()
    }

    fn draft(title: &str, url: &str, date_time: DateTime<Utc>) -> DraftEvent {
        DraftEvent {
            title: title.to_string(),
            date_time,
            venue_name: Some("The Basement".to_string()),
            venue_address: Some("7 Macquarie Pl, Sydney".to_string()),
            city: "Sydney, Australia".to_string(),
            description: Some("Live set".to_string()),
            category: vec!["Sydney".to_string(), "Music".to_string()],
            image_url: None,
            source_website: "Eventbrite".to_string(),
            original_url: url.to_string(),
            last_scraped_at: t0(),
        }
    }

    #[test]
    fn first_sighting_creates_new_event() {
        let store = Store::open_in_memory().expect("store");
        let outcome = store
            .reconcile(&draft("Jazz Night", "https://x/1", t0()), t0())
            .expect("reconcile");
        assert_eq!(outcome, ReconcileOutcome::Created);

        let event = store
            .find_by_identity("https://x/1", "Jazz Night")
            .expect("query")
            .expect("event");
        assert_eq!(event.status, EventStatus::New);
        assert_eq!(event.id, event_id("https://x/1", "Jazz Night"));
        assert_eq!(event.date_time, t0());
        assert_eq!(event.category, vec!["Sydney".to_string(), "Music".to_string()]);
        assert_eq!(event.imported_at, None);
    }

    #[test]
    fn separator_in_url_or_title_keeps_keys_apart() {
        let store = Store::open_in_memory().expect("store");
        assert_ne!(
            event_id("https://x/e?q=1", "Jazz|Late Show"),
            event_id("https://x/e?q=1|Jazz", "Late Show")
        );

        store
            .reconcile(&draft("Jazz|Late Show", "https://x/e?q=1", t0()), t0())
            .expect("first key");
        let outcome = store
            .reconcile(&draft("Late Show", "https://x/e?q=1|Jazz", t0()), t0())
            .expect("second key");
        assert_eq!(outcome, ReconcileOutcome::Created);
        assert_eq!(store.count_events().expect("count"), 2);
    }

    #[test]
    fn concurrent_reconciles_share_one_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("events.sqlite");
        Store::open(&path).expect("schema");
        let d = draft("Jazz Night", "https://x/1", t0());

        std::thread::scope(|scope| {
            for _ in 0..2 {
                scope.spawn(|| {
                    let store = Store::open(&path).expect("store");
                    for _ in 0..20 {
                        store.reconcile(&d, t0()).expect("reconcile");
                    }
                });
            }
        });

        let store = Store::open(&path).expect("store");
        assert_eq!(store.count_events().expect("count"), 1);
    }

    #[test]
    fn ticket_interest_requires_known_event() {
        let store = Store::open_in_memory().expect("store");
        store
            .reconcile(&draft("Jazz Night", "https://x/1", t0()), t0())
            .expect("reconcile");
        let id = event_id("https://x/1", "Jazz Night");

        let interest = store
            .record_ticket_interest("fan@example.com", &id, false, t0())
            .expect("record");
        assert_eq!(interest.event_id, id);
        assert!(!interest.opt_in);

        let stored: (String, bool) = store
            .lock()
            .query_row(
                "SELECT email, opt_in FROM ticket_interests WHERE id = ?1",
                params![interest.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("row");
        assert_eq!(stored, ("fan@example.com".to_string(), false));

        let err = store
            .record_ticket_interest("fan@example.com", "missing", true, t0())
            .expect_err("unknown event");
        assert!(matches!(err, PipelineError::NotFound(_)));
    }

    #[test]
    fn date_drift_marks_updated_then_import_sticks() {
        let store = Store::open_in_memory().expect("store");
        let t1 = t0() + Duration::hours(2);
        let t2 = t0() + Duration::days(1);

        store
            .reconcile(&draft("Jazz Night", "https://x/1", t0()), t0())
            .expect("first run");
        let outcome = store
            .reconcile(&draft("Jazz Night", "https://x/1", t1), t0())
            .expect("second run");
        assert_eq!(outcome, ReconcileOutcome::Changed);
        assert_eq!(store.count_events().expect("count"), 1);

        let event = store
            .find_by_identity("https://x/1", "Jazz Night")
            .expect("query")
            .expect("event");
        assert_eq!(event.status, EventStatus::Updated);
        assert_eq!(event.date_time, t1);

        let imported = store
            .import_event(&event.id, "curator", Some("confirmed"), t0())
            .expect("import");
        assert_eq!(imported.status, EventStatus::Imported);
        assert_eq!(imported.import_notes.as_deref(), Some("confirmed"));
        assert_eq!(imported.imported_by.as_deref(), Some("curator"));
        assert_eq!(imported.imported_at, Some(t0()));

        let outcome = store
            .reconcile(&draft("Jazz Night", "https://x/1", t2), t0())
            .expect("third run");
        assert_eq!(outcome, ReconcileOutcome::Changed);
        let event = store.get_event(&event.id).expect("query").expect("event");
        assert_eq!(event.date_time, t2);
        assert_eq!(event.status, EventStatus::Imported);
        assert_eq!(event.import_notes.as_deref(), Some("confirmed"));
    }

    #[test]
    fn reconciling_same_draft_twice_is_idempotent() {
        let store = Store::open_in_memory().expect("store");
        let precise = (t0() + Duration::nanoseconds(123_456_789)).trunc_subsecs(3);
        let d = draft("Harbour Cruise", "https://x/2", precise);

        assert_eq!(store.reconcile(&d, t0()).expect("first"), ReconcileOutcome::Created);
        let before = store
            .find_by_identity("https://x/2", "Harbour Cruise")
            .expect("query")
            .expect("event");
        assert_eq!(store.reconcile(&d, t0()).expect("second"), ReconcileOutcome::Refreshed);
        let after = store
            .find_by_identity("https://x/2", "Harbour Cruise")
            .expect("query")
            .expect("event");

        assert_eq!(after.status, EventStatus::New);
        assert_eq!(after.date_time, before.date_time);
        assert_eq!(after.venue_name, before.venue_name);
        assert_eq!(store.count_events().expect("count"), 1);
    }

    #[test]
    fn untracked_field_changes_refresh_without_status_change() {
        let store = Store::open_in_memory().expect("store");
        let mut d = draft("Comedy Hour", "https://x/3", t0());
        store.reconcile(&d, t0()).expect("first");

        d.description = Some("Now with a headliner".to_string());
        d.image_url = Some("https://img/x.jpg".to_string());
        assert_eq!(store.reconcile(&d, t0()).expect("second"), ReconcileOutcome::Refreshed);

        let event = store
            .find_by_identity("https://x/3", "Comedy Hour")
            .expect("query")
            .expect("event");
        assert_eq!(event.status, EventStatus::New);
        assert_eq!(event.description.as_deref(), Some("Now with a headliner"));
        assert_eq!(event.image_url.as_deref(), Some("https://img/x.jpg"));
    }

    #[test]
    fn venue_change_marks_updated() {
        let store = Store::open_in_memory().expect("store");
        let mut d = draft("Poetry Slam", "https://x/4", t0());
        store.reconcile(&d, t0()).expect("first");
        d.venue_name = None;
        assert_eq!(store.reconcile(&d, t0()).expect("second"), ReconcileOutcome::Changed);
        let event = store
            .find_by_identity("https://x/4", "Poetry Slam")
            .expect("query")
            .expect("event");
        assert_eq!(event.status, EventStatus::Updated);
        assert_eq!(event.venue_name, None);
    }

    #[test]
    fn title_drift_creates_a_separate_record() {
        let store = Store::open_in_memory().expect("store");
        store
            .reconcile(&draft("Jazz Night", "https://x/1", t0()), t0())
            .expect("first");
        store
            .reconcile(&draft("Jazz Night (Late Show)", "https://x/1", t0()), t0())
            .expect("second");
        assert_eq!(store.count_events().expect("count"), 2);
    }

    #[test]
    fn sweep_deactivates_past_events_except_imported() {
        let store = Store::open_in_memory().expect("store");
        let now = t0();
        let past = now - Duration::days(1);
        let future = now + Duration::days(1);

        store.reconcile(&draft("Past New", "https://x/a", past), now).expect("a");
        store.reconcile(&draft("Past Imported", "https://x/b", past), now).expect("b");
        store.reconcile(&draft("Future New", "https://x/c", future), now).expect("c");
        store
            .import_event(&event_id("https://x/b", "Past Imported"), "curator", None, now)
            .expect("import");

        assert_eq!(store.sweep_stale(now).expect("sweep"), 1);
        assert_eq!(store.sweep_stale(now).expect("second sweep"), 0);

        let status = |url: &str, title: &str| {
            store
                .find_by_identity(url, title)
                .expect("query")
                .expect("event")
                .status
        };
        assert_eq!(status("https://x/a", "Past New"), EventStatus::Inactive);
        assert_eq!(status("https://x/b", "Past Imported"), EventStatus::Imported);
        assert_eq!(status("https://x/c", "Future New"), EventStatus::New);
    }

    #[test]
    fn import_unknown_id_is_not_found() {
        let store = Store::open_in_memory().expect("store");
        let err = store
            .import_event("missing", "curator", Some("x"), t0())
            .expect_err("should fail");
        assert!(matches!(err, PipelineError::NotFound(id) if id == "missing"));
    }

    #[test]
    fn import_defaults_notes_to_empty() {
        let store = Store::open_in_memory().expect("store");
        store
            .reconcile(&draft("Gallery Opening", "https://x/5", t0()), t0())
            .expect("reconcile");
        let event = store
            .import_event(&event_id("https://x/5", "Gallery Opening"), "curator", None, t0())
            .expect("import");
        assert_eq!(event.import_notes.as_deref(), Some(""));
    }

    #[test]
    fn list_events_applies_filters() {
        let store = Store::open_in_memory().expect("store");
        let now = t0();
        let mut melbourne = draft("Laneway Gig", "https://x/m", now + Duration::days(2));
        melbourne.city = "Melbourne, Australia".to_string();
        let mut yoga = draft("Sunrise Yoga", "https://x/y", now + Duration::days(1));
        yoga.venue_name = Some("Bondi Pavilion".to_string());
        store.reconcile(&melbourne, now).expect("m");
        store.reconcile(&yoga, now).expect("y");
        store
            .reconcile(&draft("Old Show", "https://x/o", now - Duration::days(3)), now)
            .expect("o");
        store.sweep_stale(now).expect("sweep");

        let sydney_upcoming = store
            .list_events(
                &EventQuery {
                    city: Some("sydney".to_string()),
                    upcoming: true,
                    ..EventQuery::default()
                },
                now,
            )
            .expect("list");
        assert_eq!(sydney_upcoming.len(), 1);
        assert_eq!(sydney_upcoming[0].title, "Sunrise Yoga");

        let by_venue = store
            .list_events(
                &EventQuery {
                    keyword: Some("bondi".to_string()),
                    ..EventQuery::default()
                },
                now,
            )
            .expect("list");
        assert_eq!(by_venue.len(), 1);

        let inactive = store
            .list_events(
                &EventQuery {
                    status: Some(EventStatus::Inactive),
                    ..EventQuery::default()
                },
                now,
            )
            .expect("list");
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].title, "Old Show");

        let windowed = store
            .list_events(
                &EventQuery {
                    date_from: Some(now),
                    date_to: Some(now + Duration::days(1)),
                    limit: Some(10),
                    ..EventQuery::default()
                },
                now,
            )
            .expect("list");
        assert_eq!(windowed.len(), 1);

        let all = store.list_events(&EventQuery::default(), now).expect("list");
        assert_eq!(
            all.iter().map(|e| e.title.as_str()).collect::<Vec<_>>(),
            vec!["Old Show", "Sunrise Yoga", "Laneway Gig"]
        );
    }

    #[test]
    fn keyword_wildcards_are_literal() {
        let store = Store::open_in_memory().expect("store");
        store
            .reconcile(&draft("Trivia Night", "https://x/t", t0()), t0())
            .expect("reconcile");
        let hits = store
            .list_events(
                &EventQuery {
                    keyword: Some("%".to_string()),
                    ..EventQuery::default()
                },
                t0(),
            )
            .expect("list");
        assert!(hits.is_empty());
    }
}
