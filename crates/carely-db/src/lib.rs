// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use carely_app::{Appointment, DOCTORS, SPECIALTIES, SettingKey, SettingsStore, TIME_SLOTS};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};

pub const APP_NAME: &str = "carely";
pub const DB_PATH_ENV: &str = "CARELY_DB_PATH";

const SCHEMA_SQL: &str = "
CREATE TABLE settings (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[("settings", &["key", "value", "updated_at"])];

const DEMO_WEEK_HISTORY: [u32; 7] = [8_234, 4_567, 9_102, 6_543, 7_891, 5_234, 10_412];
const DEMO_TODAY_STEPS: u32 = 3_456;

const DEMO_PATIENTS: [(&str, &str, &str); 2] = [
    ("Avery Walker", "34", "(555) 201-7788"),
    ("Jordan Reed", "61", "(555) 348-1190"),
];

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the schema in an empty database, or checks that an existing
    /// one has every table and column the app reads.
    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn.execute_batch(SCHEMA_SQL).context("create schema")?;
            tracing::info!("created settings schema");
        }
        Ok(())
    }

    /// Keys currently holding a value, in [`SettingKey::ALL`] order. Rows
    /// written by other tools are ignored.
    pub fn stored_keys(&self) -> Result<Vec<SettingKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM settings")
            .context("prepare settings keys query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query settings keys")?;
        let present = rows
            .collect::<rusqlite::Result<BTreeSet<_>>>()
            .context("collect settings keys")?;
        Ok(SettingKey::ALL
            .into_iter()
            .filter(|key| present.contains(key.as_str()))
            .collect())
    }

    pub fn updated_at(&self, key: SettingKey) -> Result<Option<OffsetDateTime>> {
        let raw = self
            .conn
            .query_row(
                "SELECT updated_at FROM settings WHERE key = ?",
                params![key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read timestamp for {}", key.as_str()))?;
        raw.map(|value| {
            OffsetDateTime::parse(&value, &Rfc3339)
                .with_context(|| format!("parse timestamp {value:?} for {}", key.as_str()))
        })
        .transpose()
    }

    /// Fills an empty store with a week of step history, a partial day and
    /// two upcoming appointments.
    pub fn seed_demo_data(&mut self, today: Date) -> Result<()> {
        if !self.stored_keys()?.is_empty() {
            bail!("refusing to seed demo data into a database that already has settings");
        }

        let date = today
            .format(format_description!("[year]-[month]-[day]"))
            .context("format demo date")?;
        self.set_string(SettingKey::StepCountDate, &date)?;
        self.set_number(SettingKey::TodaySteps, f64::from(DEMO_TODAY_STEPS))?;
        let history = serde_json::to_string(&DEMO_WEEK_HISTORY).context("encode demo history")?;
        self.set_string(SettingKey::WeekHistory, &history)?;

        let timestamp = now_rfc3339()?;
        let mut appointments = Vec::with_capacity(DEMO_PATIENTS.len());
        for (offset, (name, age, phone)) in DEMO_PATIENTS.iter().enumerate() {
            let day = today
                .checked_add(Duration::days(offset as i64 + 1))
                .ok_or_else(|| anyhow!("demo appointment date overflows the calendar"))?;
            appointments.push(Appointment {
                doctor: DOCTORS[offset % DOCTORS.len()].name.to_owned(),
                specialty: SPECIALTIES[(offset + 1) % SPECIALTIES.len()].to_owned(),
                patient_name: (*name).to_owned(),
                patient_age: (*age).to_owned(),
                patient_phone: (*phone).to_owned(),
                date: day
                    .format(format_description!(
                        "[weekday repr:short], [month repr:short] [day padding:none]"
                    ))
                    .context("format demo appointment date")?,
                time: TIME_SLOTS[offset * 2 % TIME_SLOTS.len()].to_owned(),
                timestamp: timestamp.clone(),
            });
        }
        let encoded = serde_json::to_string(&appointments).context("encode demo appointments")?;
        self.set_string(SettingKey::Appointments, &encoded)?;

        tracing::info!(%today, "seeded demo data");
        Ok(())
    }

    fn get_setting_raw(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read setting {key}"))
    }

    fn put_setting_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert setting {key}"))?;
        Ok(())
    }

    fn delete_setting_raw(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", params![key])
            .with_context(|| format!("delete setting {key}"))?;
        Ok(())
    }
}

impl SettingsStore for Store {
    fn get_string(&self, key: SettingKey) -> Result<Option<String>> {
        self.get_setting_raw(key.as_str())
    }

    fn set_string(&mut self, key: SettingKey, value: &str) -> Result<()> {
        self.put_setting_raw(key.as_str(), value)
    }

    fn remove(&mut self, key: SettingKey) -> Result<()> {
        self.delete_setting_raw(key.as_str())
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os(DB_PATH_ENV) {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set {DB_PATH_ENV} to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("carely.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point {DB_PATH_ENV} at a carely database"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; move the file aside to start fresh",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
