// SQLite-backed store (bundled rusqlite)

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use milla_core::ports::{ArticleCatalog, DespatchStore, RecipientDirectory, ReceptionStore, VehicleRegistry};
use milla_core::{
    Article, ArticleId, ArticleKey, CoreError, CountedLine, DespatchDraft, DespatchId, DespatchLine, Load, LoadId,
    LoadLedger, LoadStatus, ManifestLine, PlanKind, ReceptionSession, SessionStatus, Vehicle, VehicleId,
};

use crate::dataset::{Dataset, LoadRecord, Recipient, SeedSummary};

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL,
    code_key TEXT NOT NULL UNIQUE,       -- ArticleKey: trimmed, Unicode-uppercased
    description TEXT NOT NULL,
    factor_general REAL NOT NULL DEFAULT 1.0,
    factor_intermediate REAL NOT NULL DEFAULT 1.0,
    factor_special REAL NOT NULL DEFAULT 1.0
);

CREATE TABLE IF NOT EXISTS vehicles (
    id INTEGER PRIMARY KEY,
    plate TEXT NOT NULL,
    capacity REAL,                       -- NULL = unknown, packed as unbounded
    available INTEGER NOT NULL DEFAULT 1,
    deleted INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS recipients (
    id INTEGER PRIMARY KEY,
    address TEXT NOT NULL,
    name TEXT,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS loads (
    id INTEGER PRIMARY KEY,
    load_number TEXT NOT NULL,
    plate TEXT NOT NULL,
    order_ref TEXT,
    origin TEXT,
    address TEXT,
    plan TEXT NOT NULL DEFAULT 'normal',
    status TEXT NOT NULL DEFAULT 'pending',
    UNIQUE (load_number, plate)
);

CREATE TABLE IF NOT EXISTS manifest_lines (
    load_id INTEGER NOT NULL REFERENCES loads(id),
    position INTEGER NOT NULL,
    article_code TEXT NOT NULL,
    expected_qty REAL NOT NULL,
    unit TEXT NOT NULL DEFAULT '',
    volume REAL,
    remission TEXT,
    PRIMARY KEY (load_id, position)
);

CREATE TABLE IF NOT EXISTS reception_sessions (
    load_id INTEGER PRIMARY KEY REFERENCES loads(id),
    operator TEXT,
    started_at TEXT NOT NULL,            -- RFC 3339
    ended_at TEXT,
    failed_attempts INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reception_counts (
    load_id INTEGER NOT NULL REFERENCES reception_sessions(load_id),
    article_key TEXT NOT NULL,
    code TEXT NOT NULL,
    description TEXT NOT NULL,
    total REAL NOT NULL,
    PRIMARY KEY (load_id, article_key)
);

CREATE TABLE IF NOT EXISTS despatches (
    id INTEGER PRIMARY KEY,
    vehicle_id INTEGER NOT NULL REFERENCES vehicles(id),
    status TEXT NOT NULL,
    occupied_volume REAL NOT NULL,
    created_by TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS despatch_lines (
    despatch_id INTEGER NOT NULL REFERENCES despatches(id),
    invoice_ref TEXT NOT NULL UNIQUE,
    address TEXT NOT NULL,
    volume REAL NOT NULL
);
"#;

fn db_err(e: rusqlite::Error) -> CoreError {
    CoreError::persistence(e.to_string())
}

/// A stored despatch line together with the despatch and vehicle it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDespatchLine {
    pub despatch_id: DespatchId,
    pub vehicle_id: VehicleId,
    pub line: DespatchLine,
}

/// Single-connection SQLite store. Every trait method takes the connection
/// lock, so callers must not re-enter the store from inside `with_ledger`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        debug!("opened database {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, CoreError> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self, CoreError> {
        // Other processes may hold the write lock; wait instead of failing.
        conn.busy_timeout(BUSY_TIMEOUT).map_err(db_err)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Load a dataset in one transaction. Articles and vehicles are upserted,
    /// loads must be new.
    pub fn seed(&self, dataset: &Dataset) -> Result<SeedSummary, CoreError> {
        dataset.validate()?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;

        for article in &dataset.articles {
            upsert_article(&tx, article)?;
        }
        for vehicle in &dataset.vehicles {
            upsert_vehicle(&tx, vehicle)?;
        }
        for recipient in &dataset.recipients {
            insert_recipient(&tx, recipient)?;
        }
        for load in &dataset.loads {
            insert_load(&tx, load)?;
        }

        tx.commit().map_err(db_err)?;

        let summary = SeedSummary {
            articles: dataset.articles.len(),
            vehicles: dataset.vehicles.len(),
            recipients: dataset.recipients.len(),
            loads: dataset.loads.len(),
        };
        info!(
            "seeded {} article(s), {} vehicle(s), {} recipient(s), {} load(s)",
            summary.articles, summary.vehicles, summary.recipients, summary.loads
        );
        Ok(summary)
    }

    pub fn insert_load(&self, record: &LoadRecord) -> Result<LoadId, CoreError> {
        record.validate()?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let id = insert_load(&tx, record)?;
        tx.commit().map_err(db_err)?;
        Ok(id)
    }

    pub fn upsert_article(&self, article: &Article) -> Result<ArticleId, CoreError> {
        upsert_article(&self.conn.lock(), article)
    }

    pub fn upsert_vehicle(&self, vehicle: &Vehicle) -> Result<(), CoreError> {
        upsert_vehicle(&self.conn.lock(), vehicle)
    }

    pub fn add_recipient(&self, recipient: &Recipient) -> Result<(), CoreError> {
        insert_recipient(&self.conn.lock(), recipient)
    }

    /// Soft-delete a vehicle; it stops showing up as available.
    pub fn retire_vehicle(&self, id: VehicleId) -> Result<(), CoreError> {
        let n = self
            .conn
            .lock()
            .execute("UPDATE vehicles SET deleted = 1 WHERE id = ?1", params![id.0])
            .map_err(db_err)?;
        if n == 0 {
            return Err(CoreError::not_found("vehicle", id));
        }
        Ok(())
    }

    pub fn loads_with_status(&self, status: LoadStatus) -> Result<Vec<Load>, CoreError> {
        let conn = self.conn.lock();
        let ids: Vec<i64> = {
            let mut stmt = conn
                .prepare("SELECT id FROM loads WHERE status = ?1 ORDER BY id")
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![status.as_str()], |row| row.get(0))
                .map_err(db_err)?;
            rows.collect::<Result<_, _>>().map_err(db_err)?
        };
        ids.into_iter()
            .map(|id| {
                read_load(&conn, LoadId(id))?.ok_or_else(|| CoreError::not_found("load", id))
            })
            .collect()
    }

    /// Loads still waiting for reception.
    pub fn pending_loads(&self) -> Result<Vec<Load>, CoreError> {
        self.loads_with_status(LoadStatus::Pending)
    }

    pub fn dispatched_refs(&self) -> Result<HashSet<String>, CoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT invoice_ref FROM despatch_lines").map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).map_err(db_err)?;
        rows.collect::<Result<_, _>>().map_err(db_err)
    }

    pub fn despatch_lines(&self) -> Result<Vec<StoredDespatchLine>, CoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT d.id, d.vehicle_id, l.invoice_ref, l.address, l.volume
                 FROM despatch_lines l JOIN despatches d ON d.id = l.despatch_id
                 ORDER BY d.id, l.rowid",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredDespatchLine {
                    despatch_id: DespatchId(row.get(0)?),
                    vehicle_id: VehicleId(row.get(1)?),
                    line: DespatchLine {
                        invoice_ref: row.get(2)?,
                        address: row.get(3)?,
                        volume: row.get(4)?,
                    },
                })
            })
            .map_err(db_err)?;
        rows.collect::<Result<_, _>>().map_err(db_err)
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn upsert_article(conn: &Connection, article: &Article) -> Result<ArticleId, CoreError> {
    let code = article.code.trim();
    let key = article.key();
    conn.execute(
        "INSERT INTO articles (id, code, code_key, description, factor_general, factor_intermediate, factor_special)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(code_key) DO UPDATE SET
            code = excluded.code,
            description = excluded.description,
            factor_general = excluded.factor_general,
            factor_intermediate = excluded.factor_intermediate,
            factor_special = excluded.factor_special",
        params![
            article.id.map(|i| i.0),
            code,
            key.as_str(),
            article.description,
            article.factor_general,
            article.factor_intermediate,
            article.factor_special
        ],
    )
    .map_err(db_err)?;
    let id = conn
        .query_row("SELECT id FROM articles WHERE code_key = ?1", params![key.as_str()], |row| row.get(0))
        .map_err(db_err)?;
    Ok(ArticleId(id))
}

fn upsert_vehicle(conn: &Connection, vehicle: &Vehicle) -> Result<(), CoreError> {
    conn.execute(
        "INSERT INTO vehicles (id, plate, capacity, available) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            plate = excluded.plate,
            capacity = excluded.capacity,
            available = excluded.available,
            deleted = 0",
        params![vehicle.id.0, vehicle.plate, vehicle.capacity, vehicle.available],
    )
    .map_err(db_err)?;
    Ok(())
}

fn insert_recipient(conn: &Connection, recipient: &Recipient) -> Result<(), CoreError> {
    conn.execute(
        "INSERT INTO recipients (address, name, active) VALUES (?1, ?2, ?3)",
        params![recipient.address, recipient.name, recipient.active],
    )
    .map_err(db_err)?;
    Ok(())
}

fn insert_load(conn: &Connection, record: &LoadRecord) -> Result<LoadId, CoreError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM loads WHERE load_number = ?1 AND plate = ?2",
            params![record.load_number, record.plate],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;
    if exists.is_some() {
        return Err(CoreError::validation(format!(
            "load {}/{} already exists",
            record.load_number, record.plate
        )));
    }

    conn.execute(
        "INSERT INTO loads (load_number, plate, order_ref, origin, address, plan, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.load_number,
            record.plate,
            record.order_ref,
            record.origin,
            record.address,
            record.plan.as_str(),
            LoadStatus::Pending.as_str()
        ],
    )
    .map_err(db_err)?;
    let id = conn.last_insert_rowid();

    let mut stmt = conn
        .prepare(
            "INSERT INTO manifest_lines (load_id, position, article_code, expected_qty, unit, volume, remission)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .map_err(db_err)?;
    for (pos, line) in record.lines.iter().enumerate() {
        stmt.execute(params![
            id,
            pos as i64,
            line.article_code,
            line.expected_qty,
            line.unit,
            line.volume,
            line.remission
        ])
        .map_err(db_err)?;
    }

    Ok(LoadId(id))
}

fn read_load(conn: &Connection, id: LoadId) -> Result<Option<Load>, CoreError> {
    let row = conn
        .query_row(
            "SELECT load_number, plate, order_ref, origin, address, plan, status FROM loads WHERE id = ?1",
            params![id.0],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()
        .map_err(db_err)?;

    let Some((load_number, plate, order_ref, origin, address, plan, status)) = row else {
        return Ok(None);
    };

    let plan = PlanKind::parse(&plan)
        .ok_or_else(|| CoreError::persistence(format!("load {id}: unknown plan '{plan}'")))?;
    let status = LoadStatus::parse(&status)
        .ok_or_else(|| CoreError::persistence(format!("load {id}: unknown status '{status}'")))?;

    let mut stmt = conn
        .prepare(
            "SELECT article_code, expected_qty, unit, volume, remission
             FROM manifest_lines WHERE load_id = ?1 ORDER BY position",
        )
        .map_err(db_err)?;
    let lines = stmt
        .query_map(params![id.0], |row| {
            Ok(ManifestLine {
                article_code: row.get(0)?,
                expected_qty: row.get(1)?,
                unit: row.get(2)?,
                volume: row.get(3)?,
                remission: row.get(4)?,
            })
        })
        .map_err(db_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(Some(Load { id, load_number, plate, order_ref, origin, address, plan, status, lines }))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CoreError::persistence(format!("bad timestamp '{raw}': {e}")))
}

fn read_session(conn: &Connection, id: LoadId) -> Result<Option<ReceptionSession>, CoreError> {
    let row = conn
        .query_row(
            "SELECT operator, started_at, ended_at, failed_attempts, status
             FROM reception_sessions WHERE load_id = ?1",
            params![id.0],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()
        .map_err(db_err)?;

    let Some((operator, started_at, ended_at, failed_attempts, status)) = row else {
        return Ok(None);
    };

    let status = SessionStatus::parse(&status)
        .ok_or_else(|| CoreError::persistence(format!("load {id}: unknown session status '{status}'")))?;

    let mut session = ReceptionSession {
        operator,
        started_at: parse_time(&started_at)?,
        ended_at: ended_at.as_deref().map(parse_time).transpose()?,
        failed_attempts,
        status,
        counts: Default::default(),
    };

    let mut stmt = conn
        .prepare("SELECT article_key, code, description, total FROM reception_counts WHERE load_id = ?1")
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![id.0], |row| {
            Ok((
                row.get::<_, String>(0)?,
                CountedLine { code: row.get(1)?, description: row.get(2)?, total: row.get(3)? },
            ))
        })
        .map_err(db_err)?;
    for row in rows {
        let (key, line) = row.map_err(db_err)?;
        session.counts.insert(ArticleKey::new(&key), line);
    }

    Ok(Some(session))
}

fn read_ledger(conn: &Connection, id: LoadId) -> Result<LoadLedger, CoreError> {
    let load = read_load(conn, id)?.ok_or_else(|| CoreError::not_found("load", id))?;
    let session = read_session(conn, id)?;
    Ok(LoadLedger { load, session })
}

/// Persist what the engine may change: load status and the whole session.
fn write_ledger(conn: &Connection, before: &LoadLedger, after: &LoadLedger) -> Result<(), CoreError> {
    let id = after.load.id;

    if before.load.status != after.load.status {
        conn.execute(
            "UPDATE loads SET status = ?1 WHERE id = ?2",
            params![after.load.status.as_str(), id.0],
        )
        .map_err(db_err)?;
    }

    let Some(session) = &after.session else {
        return Ok(());
    };

    conn.execute(
        "INSERT INTO reception_sessions (load_id, operator, started_at, ended_at, failed_attempts, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(load_id) DO UPDATE SET
            operator = excluded.operator,
            started_at = excluded.started_at,
            ended_at = excluded.ended_at,
            failed_attempts = excluded.failed_attempts,
            status = excluded.status",
        params![
            id.0,
            session.operator,
            session.started_at.to_rfc3339(),
            session.ended_at.map(|t| t.to_rfc3339()),
            session.failed_attempts,
            session.status.as_str()
        ],
    )
    .map_err(db_err)?;

    conn.execute("DELETE FROM reception_counts WHERE load_id = ?1", params![id.0])
        .map_err(db_err)?;
    let mut stmt = conn
        .prepare(
            "INSERT INTO reception_counts (load_id, article_key, code, description, total)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(db_err)?;
    for (key, line) in &session.counts {
        stmt.execute(params![id.0, key.as_str(), line.code, line.description, line.total])
            .map_err(db_err)?;
    }
    Ok(())
}

fn read_article(row: &rusqlite::Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: Some(ArticleId(row.get(0)?)),
        code: row.get(1)?,
        description: row.get(2)?,
        factor_general: row.get(3)?,
        factor_intermediate: row.get(4)?,
        factor_special: row.get(5)?,
    })
}

// ---------------------------------------------------------------------------
// Collaborator contracts
// ---------------------------------------------------------------------------

impl ReceptionStore for SqliteStore {
    fn ledger(&self, load_id: LoadId) -> Result<LoadLedger, CoreError> {
        read_ledger(&self.conn.lock(), load_id)
    }

    fn with_ledger<T>(
        &self,
        load_id: LoadId,
        f: impl FnOnce(&mut LoadLedger) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let before = read_ledger(&tx, load_id)?;
        let mut after = before.clone();
        // An error drops `tx`, which rolls back.
        let value = f(&mut after)?;

        if after != before {
            write_ledger(&tx, &before, &after)?;
        }
        tx.commit().map_err(db_err)?;
        Ok(value)
    }
}

impl ArticleCatalog for SqliteStore {
    fn lookup_by_code(&self, code: &str) -> Result<Option<Article>, CoreError> {
        let key = ArticleKey::new(code);
        self.conn
            .lock()
            .query_row(
                "SELECT id, code, description, factor_general, factor_intermediate, factor_special
                 FROM articles WHERE code_key = ?1",
                params![key.as_str()],
                read_article,
            )
            .optional()
            .map_err(db_err)
    }

    fn get(&self, id: ArticleId) -> Result<Option<Article>, CoreError> {
        self.conn
            .lock()
            .query_row(
                "SELECT id, code, description, factor_general, factor_intermediate, factor_special
                 FROM articles WHERE id = ?1",
                params![id.0],
                read_article,
            )
            .optional()
            .map_err(db_err)
    }
}

impl VehicleRegistry for SqliteStore {
    fn list_available(&self) -> Result<Vec<Vehicle>, CoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, plate, capacity FROM vehicles WHERE available = 1 AND deleted = 0 ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Vehicle {
                    id: VehicleId(row.get(0)?),
                    plate: row.get(1)?,
                    capacity: row.get(2)?,
                    available: true,
                })
            })
            .map_err(db_err)?;
        rows.collect::<Result<_, _>>().map_err(db_err)
    }
}

impl RecipientDirectory for SqliteStore {
    fn list_active_recipients(&self) -> Result<Vec<String>, CoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT address FROM recipients WHERE active = 1 ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).map_err(db_err)?;
        rows.collect::<Result<_, _>>().map_err(db_err)
    }
}

impl DespatchStore for SqliteStore {
    fn create_despatches(&self, drafts: &[DespatchDraft]) -> Result<Vec<DespatchId>, CoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(db_err)?;
        let created_at = Utc::now().to_rfc3339();
        let mut ids = Vec::with_capacity(drafts.len());

        {
            let mut head = tx
                .prepare(
                    "INSERT INTO despatches (vehicle_id, status, occupied_volume, created_by, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(db_err)?;
            let mut line_stmt = tx
                .prepare(
                    "INSERT INTO despatch_lines (despatch_id, invoice_ref, address, volume)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(db_err)?;

            for draft in drafts {
                let id = head
                    .insert(params![
                        draft.vehicle_id.0,
                        draft.status.as_str(),
                        draft.occupied_volume,
                        draft.created_by,
                        created_at
                    ])
                    .map_err(db_err)?;
                for line in &draft.lines {
                    line_stmt
                        .execute(params![id, line.invoice_ref, line.address, line.volume])
                        .map_err(db_err)?;
                }
                ids.push(DespatchId(id));
            }
        }

        tx.commit().map_err(db_err)?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LoadRecord {
        LoadRecord {
            load_number: "C-1".into(),
            plate: "TRK1".into(),
            order_ref: Some("PED-1".into()),
            origin: None,
            address: Some("Calle 1".into()),
            plan: PlanKind::Normal,
            lines: vec![ManifestLine {
                article_code: "sku-1".into(),
                expected_qty: 5.0,
                unit: "UND".into(),
                volume: Some(2.5),
                remission: None,
            }],
        }
    }

    #[test]
    fn load_round_trips_through_tables() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_load(&record()).unwrap();
        let ledger = store.ledger(id).unwrap();
        assert_eq!(ledger.load.load_number, "C-1");
        assert_eq!(ledger.load.status, LoadStatus::Pending);
        assert_eq!(ledger.load.lines[0].volume, Some(2.5));
        assert!(ledger.session.is_none());
    }

    #[test]
    fn with_ledger_rolls_back_on_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_load(&record()).unwrap();
        let res: Result<(), CoreError> = store.with_ledger(id, |ledger| {
            ledger.load.status = LoadStatus::ValidatedOk;
            ledger.session_or_start(None, Utc::now());
            Err(CoreError::validation("nope"))
        });
        assert!(res.is_err());
        let ledger = store.ledger(id).unwrap();
        assert_eq!(ledger.load.status, LoadStatus::Pending);
        assert!(ledger.session.is_none());
    }

    #[test]
    fn lookup_by_code_ignores_case_and_padding() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut article = Article::placeholder("CJ-12");
        article.factor_intermediate = 12.0;
        let id = store.upsert_article(&article).unwrap();
        let found = store.lookup_by_code("  cj-12 ").unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.factor_intermediate, 12.0);
        assert!(store.lookup_by_code("nope").unwrap().is_none());
    }

    #[test]
    fn lookup_by_code_folds_non_ascii_letters() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut article = Article::placeholder("cañ-12");
        article.factor_intermediate = 12.0;
        let id = store.upsert_article(&article).unwrap();

        let found = store.lookup_by_code("CAÑ-12").unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.factor_intermediate, 12.0);

        // same key, different spelling: one catalog row
        article.code = " CAÑ-12".into();
        assert_eq!(store.upsert_article(&article).unwrap(), id);
    }

    #[test]
    fn retired_vehicles_are_not_available() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (id, available) in [(1, true), (2, false), (3, true)] {
            store
                .upsert_vehicle(&Vehicle { id: VehicleId(id), plate: format!("P{id}"), capacity: None, available })
                .unwrap();
        }
        store.retire_vehicle(VehicleId(3)).unwrap();
        let ids: Vec<_> = store.list_available().unwrap().into_iter().map(|v| v.id.0).collect();
        assert_eq!(ids, vec![1]);
        assert!(store.retire_vehicle(VehicleId(99)).is_err());
    }
}
