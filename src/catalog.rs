use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::filter::INPUT_DATE_FORMAT;
use crate::model::AdvisoryRecord;

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS advisories (
            path             TEXT PRIMARY KEY,
            alert_code       TEXT NOT NULL,
            title            TEXT NOT NULL,
            publication_date TEXT NOT NULL,
            detail_url       TEXT NOT NULL,
            section_count    INTEGER NOT NULL,
            block_count      INTEGER NOT NULL,
            written_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_advisories_date ON advisories(publication_date);
        CREATE INDEX IF NOT EXISTS idx_advisories_code ON advisories(alert_code);
        ",
    )?;
    Ok(())
}

/// Index written records by output path, replacing rows for rewritten paths.
pub fn save_records(conn: &Connection, rows: &[(PathBuf, &AdvisoryRecord)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO advisories
             (path, alert_code, title, publication_date, detail_url, section_count, block_count, written_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now'))",
        )?;
        for (path, record) in rows {
            let s = &record.summary;
            count += stmt.execute(rusqlite::params![
                path.to_string_lossy().into_owned(),
                s.alert_code,
                s.title,
                s.publication_date.format(INPUT_DATE_FORMAT).to_string(),
                s.detail_url,
                record.sections.len() as i64,
                record.block_count() as i64,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub struct CatalogStats {
    pub records: i64,
    pub dates: i64,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub blocks: i64,
}

pub fn get_stats(conn: &Connection) -> Result<CatalogStats> {
    let stats = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT publication_date), MIN(publication_date),
                MAX(publication_date), COALESCE(SUM(block_count), 0)
         FROM advisories",
        [],
        |row| {
            Ok(CatalogStats {
                records: row.get(0)?,
                dates: row.get(1)?,
                earliest: row.get(2)?,
                latest: row.get(3)?,
                blocks: row.get(4)?,
            })
        },
    )?;
    Ok(stats)
}

// ── Tests ──
