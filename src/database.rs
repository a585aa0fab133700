use crate::models::{Anchor, AnchorInput, Moto, MotoInput, Tag, TagInput};
use anyhow::{Context, Result};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub motos: usize,
    pub tags: usize,
    pub anchors: usize,
}

const MOTO_COLUMNS: &str = "id, plate, model, color, year, status, tag_code, last_lat, last_lng";
const TAG_COLUMNS: &str = "id, code, mac, calibrated_rssi, battery_percent, status";
const ANCHOR_COLUMNS: &str = "id, name, latitude, longitude, range_meters, status";

fn moto_from_row(row: &Row<'_>) -> rusqlite::Result<Moto> {
    Ok(Moto {
        id: row.get(0)?,
        plate: row.get(1)?,
        model: row.get(2)?,
        color: row.get(3)?,
        year: row.get(4)?,
        status: row.get(5)?,
        tag_code: row.get(6)?,
        last_lat: row.get(7)?,
        last_lng: row.get(8)?,
    })
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        code: row.get(1)?,
        mac: row.get(2)?,
        calibrated_rssi: row.get(3)?,
        battery_percent: row.get(4)?,
        status: row.get(5)?,
    })
}

fn anchor_from_row(row: &Row<'_>) -> rusqlite::Result<Anchor> {
    Ok(Anchor {
        id: row.get(0)?,
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        range_meters: row.get(4)?,
        status: row.get(5)?,
    })
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database: {:?}", path.as_ref()))?;

        let db = Database { conn };
        db.initialize()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT UNIQUE NOT NULL,
                mac TEXT NOT NULL,
                calibrated_rssi INTEGER NOT NULL,
                battery_percent INTEGER NOT NULL DEFAULT 100,
                status TEXT NOT NULL DEFAULT 'ativo'
            );

            CREATE TABLE IF NOT EXISTS motos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plate TEXT UNIQUE NOT NULL,
                model TEXT NOT NULL,
                color TEXT NOT NULL DEFAULT '',
                year INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'disponivel',
                tag_code TEXT REFERENCES tags(code) ON UPDATE CASCADE ON DELETE SET NULL,
                last_lat REAL,
                last_lng REAL
            );

            CREATE TABLE IF NOT EXISTS anchors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                range_meters REAL NOT NULL DEFAULT 30.0,
                status TEXT NOT NULL DEFAULT 'ativo'
            );

            CREATE INDEX IF NOT EXISTS idx_motos_tag_code ON motos(tag_code);
            CREATE INDEX IF NOT EXISTS idx_tags_mac ON tags(mac);
            "#,
        )?;

        Ok(())
    }

    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // Motos

    pub fn insert_moto(&self, input: &MotoInput) -> Result<Moto> {
        self.conn.execute(
            "INSERT INTO motos (plate, model, color, year, status, tag_code, last_lat, last_lng)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                &input.plate,
                &input.model,
                &input.color,
                input.year,
                &input.status,
                &input.tag_code,
                input.last_lat,
                input.last_lng,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        Ok(Moto {
            id,
            plate: input.plate.clone(),
            model: input.model.clone(),
            color: input.color.clone(),
            year: input.year,
            status: input.status.clone(),
            tag_code: input.tag_code.clone(),
            last_lat: input.last_lat,
            last_lng: input.last_lng,
        })
    }

    pub fn get_moto(&self, id: i64) -> Result<Option<Moto>> {
        let moto = self
            .conn
            .query_row(
                &format!("SELECT {} FROM motos WHERE id = ?", MOTO_COLUMNS),
                params![id],
                moto_from_row,
            )
            .optional()?;
        Ok(moto)
    }

    pub fn list_motos(&self, offset: usize, limit: usize) -> Result<Vec<Moto>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM motos ORDER BY id LIMIT ? OFFSET ?",
            MOTO_COLUMNS
        ))?;

        let motos = stmt
            .query_map(params![limit as i64, offset as i64], moto_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(motos)
    }

    pub fn count_motos(&self) -> Result<usize> {
        self.count("motos")
    }

    /// Returns false when no moto has this id
    pub fn update_moto(&self, id: i64, input: &MotoInput) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE motos SET plate = ?, model = ?, color = ?, year = ?, status = ?,
                tag_code = ?, last_lat = ?, last_lng = ?
             WHERE id = ?",
            params![
                &input.plate,
                &input.model,
                &input.color,
                input.year,
                &input.status,
                &input.tag_code,
                input.last_lat,
                input.last_lng,
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_moto(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM motos WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    // Tags

    pub fn insert_tag(&self, input: &TagInput) -> Result<Tag> {
        self.conn.execute(
            "INSERT INTO tags (code, mac, calibrated_rssi, battery_percent, status)
             VALUES (?, ?, ?, ?, ?)",
            params![
                &input.code,
                &input.mac,
                input.calibrated_rssi,
                input.battery_percent,
                &input.status,
            ],
        )?;

        Ok(Tag {
            id: self.conn.last_insert_rowid(),
            code: input.code.clone(),
            mac: input.mac.clone(),
            calibrated_rssi: input.calibrated_rssi,
            battery_percent: input.battery_percent,
            status: input.status.clone(),
        })
    }

    pub fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                &format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS),
                params![id],
                tag_from_row,
            )
            .optional()?;
        Ok(tag)
    }

    pub fn list_tags(&self, offset: usize, limit: usize) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tags ORDER BY id LIMIT ? OFFSET ?",
            TAG_COLUMNS
        ))?;

        let tags = stmt
            .query_map(params![limit as i64, offset as i64], tag_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    pub fn count_tags(&self) -> Result<usize> {
        self.count("tags")
    }

    pub fn update_tag(&self, id: i64, input: &TagInput) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tags SET code = ?, mac = ?, calibrated_rssi = ?, battery_percent = ?, status = ?
             WHERE id = ?",
            params![
                &input.code,
                &input.mac,
                input.calibrated_rssi,
                input.battery_percent,
                &input.status,
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_tag(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM tags WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    // Anchors

    pub fn insert_anchor(&self, input: &AnchorInput) -> Result<Anchor> {
        self.conn.execute(
            "INSERT INTO anchors (name, latitude, longitude, range_meters, status)
             VALUES (?, ?, ?, ?, ?)",
            params![
                &input.name,
                input.latitude,
                input.longitude,
                input.range_meters,
                &input.status,
            ],
        )?;

        Ok(Anchor {
            id: self.conn.last_insert_rowid(),
            name: input.name.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
            range_meters: input.range_meters,
            status: input.status.clone(),
        })
    }

    pub fn get_anchor(&self, id: i64) -> Result<Option<Anchor>> {
        let anchor = self
            .conn
            .query_row(
                &format!("SELECT {} FROM anchors WHERE id = ?", ANCHOR_COLUMNS),
                params![id],
                anchor_from_row,
            )
            .optional()?;
        Ok(anchor)
    }

    pub fn list_anchors(&self, offset: usize, limit: usize) -> Result<Vec<Anchor>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM anchors ORDER BY id LIMIT ? OFFSET ?",
            ANCHOR_COLUMNS
        ))?;

        let anchors = stmt
            .query_map(params![limit as i64, offset as i64], anchor_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(anchors)
    }

    pub fn count_anchors(&self) -> Result<usize> {
        self.count("anchors")
    }

    pub fn update_anchor(&self, id: i64, input: &AnchorInput) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE anchors SET name = ?, latitude = ?, longitude = ?, range_meters = ?, status = ?
             WHERE id = ?",
            params![
                &input.name,
                input.latitude,
                input.longitude,
                input.range_meters,
                &input.status,
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_anchor(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM anchors WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    /// Populate empty moto and anchor tables with demo rows
    pub fn seed_demo_data(&self) -> Result<()> {
        if self.count_motos()? == 0 {
            // The demo moto in maintenance carries this tag
            self.conn.execute(
                "INSERT OR IGNORE INTO tags (code, mac, calibrated_rssi, battery_percent, status)
                 VALUES ('TAG-0002', 'AA:BB:CC:DD:EE:02', -59, 80, 'ativo')",
                [],
            )?;

            let motos = [
                ("ABC1D23", "CG 160", "preta", 2022, "ativa", None),
                ("DEF4G56", "Factor 150", "vermelha", 2021, "manutenção", Some("TAG-0002")),
            ];
            for (plate, model, color, year, status, tag_code) in motos {
                self.conn.execute(
                    "INSERT INTO motos (plate, model, color, year, status, tag_code) VALUES (?, ?, ?, ?, ?, ?)",
                    params![plate, model, color, year, status, tag_code],
                )?;
            }
            info!("Seeded {} demo motos", motos.len());
        }

        if self.count_anchors()? == 0 {
            let anchors = [
                ("Anchor A-01", -23.53, -46.70, 12.5),
                ("Anchor A-02", -23.54, -46.71, 10.0),
            ];
            for (name, latitude, longitude, range_meters) in anchors {
                self.conn.execute(
                    "INSERT INTO anchors (name, latitude, longitude, range_meters, status) VALUES (?, ?, ?, ?, 'ativo')",
                    params![name, latitude, longitude, range_meters],
                )?;
            }
            info!("Seeded {} demo anchors", anchors.len());
        }

        Ok(())
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(Stats {
            motos: self.count_motos()?,
            tags: self.count_tags()?,
            anchors: self.count_anchors()?,
        })
    }
}

fn sqlite_failure(err: &anyhow::Error) -> Option<&rusqlite::ffi::Error> {
    err.chain().find_map(|cause| match cause.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, _)) => Some(e),
        _ => None,
    })
}

/// True when the error chain holds a SQLite constraint violation
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    sqlite_failure(err).is_some_and(|e| e.code == rusqlite::ErrorCode::ConstraintViolation)
}

/// True when a moto references a tag code that does not exist
pub fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    sqlite_failure(err).is_some_and(|e| e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}
