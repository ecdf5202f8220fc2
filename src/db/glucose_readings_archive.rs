use std::fmt;
use std::fs::File;
use std::io::Read;

use chrono::NaiveDateTime;
use itertools::Itertools;
use log::{debug, error, info};
use rusqlite::{params, Connection, Transaction};

use crate::error::ImportError;
use crate::utils::lib_sqlite::{self, AccessMode};

/// Unconstrained table holding the parsed rows for the duration of one run.
pub const STAGING_TABLE: &str = "temp_readings";

/// One CSV data row, before it is stamped and copied into `glucose_readings`.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedReading {
    pub patient_id: String,
    pub glucose_level: f64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlucoseReadingRecord {
    pub reading_id: i64,
    pub patient_id: String,
    pub glucose_level: f64,
    pub status: String,
    /// UTC, as returned by SQLite's `datetime('now')` at copy time.
    pub reading_time: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Data rows in the file, the header excluded.
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub rows_staged: usize,
    pub rows_imported: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read {} rows, skipped {}, staged {}, imported {}",
            self.rows_read, self.rows_skipped, self.rows_staged, self.rows_imported
        )
    }
}

#[derive(Clone, Debug)]
pub struct GlucoseReadingsArchive {
    pub csv_path: String,
    pub db_path: String,
    /// Create `glucose_readings` (and the database file) if missing.
    pub create_table: bool,
}

impl GlucoseReadingsArchive {
    /// Parse the CSV file.  See [read_readings] for the row rules.
    pub fn read_file(&self) -> Result<Vec<StagedReading>, ImportError> {
        let file = File::open(&self.csv_path)?;
        read_readings(file)
    }

    /// Parse the file and report what would be imported.  Does not touch the
    /// database.
    pub fn dry_run(&self) -> Result<Vec<StagedReading>, ImportError> {
        info!("dry run for {} ...", self.csv_path);
        let rows = self.read_file()?;
        let by_status = rows
            .iter()
            .counts_by(|e| e.status.as_str())
            .into_iter()
            .sorted()
            .map(|(status, n)| format!("{}={}", status, n))
            .join(", ");
        info!("  {} rows parsed ({})", rows.len(), by_status);
        Ok(rows)
    }

    /// Append all the rows of the CSV file to the `glucose_readings` table,
    /// going through a staging table.  All or nothing: any failure rolls
    /// back the whole run.
    ///
    /// Running it twice on the same file inserts the rows twice.
    pub fn update_db(&self) -> Result<ImportSummary, ImportError> {
        info!(
            "importing glucose readings from {} into {} ...",
            self.csv_path, self.db_path
        );
        let access_mode = if self.create_table {
            AccessMode::ReadWriteCreate
        } else {
            AccessMode::ReadWrite
        };
        let mut conn = lib_sqlite::open(&self.db_path, access_mode)?;

        let tx = conn.transaction()?;
        match self.stage_and_copy(&tx) {
            Ok(summary) => {
                tx.commit()?;
                info!("  {}", summary);
                info!("done");
                Ok(summary)
            }
            Err(e) => {
                error!("Failed to import {}: {}, rolling back", self.csv_path, e);
                tx.rollback()?;
                Err(e)
            }
        }
    }

    fn stage_and_copy(&self, tx: &Transaction) -> Result<ImportSummary, ImportError> {
        if self.create_table {
            create_table(tx)?;
        }

        if lib_sqlite::table_exists(tx, STAGING_TABLE)? {
            debug!("dropping leftover {} table", STAGING_TABLE);
        }
        tx.execute_batch(&format!(
            r#"
DROP TABLE IF EXISTS {STAGING_TABLE};
CREATE TABLE {STAGING_TABLE} (
    patient_id TEXT,
    glucose_level REAL,
    status TEXT
);
"#
        ))?;

        let file = File::open(&self.csv_path)?;
        let (rows, rows_skipped) = parse_file(file)?;
        let mut summary = ImportSummary {
            rows_read: rows.len() + rows_skipped,
            rows_skipped,
            rows_staged: rows.len(),
            rows_imported: 0,
        };

        if !rows.is_empty() {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {STAGING_TABLE} (patient_id, glucose_level, status) VALUES (?1, ?2, ?3)"
            ))?;
            for row in &rows {
                stmt.execute(params![row.patient_id, row.glucose_level, row.status])?;
            }
            debug!("  staged {} rows", rows.len());
        }

        // One statement, so datetime('now') is the same for every row.
        summary.rows_imported = tx.execute(
            &format!(
                r#"
INSERT INTO glucose_readings (patient_id, glucose_level, status, reading_time)
SELECT patient_id, glucose_level, status, datetime('now')
FROM {STAGING_TABLE}
ORDER BY rowid;
"#
            ),
            [],
        )?;

        tx.execute_batch(&format!("DROP TABLE {STAGING_TABLE};"))?;
        Ok(summary)
    }

    /// Return the readings stored in the database, optionally for one patient only.
    pub fn get_readings(
        &self,
        patient_id: Option<&str>,
    ) -> Result<Vec<GlucoseReadingRecord>, ImportError> {
        let conn = lib_sqlite::open(&self.db_path, AccessMode::ReadOnly)?;
        query_readings(&conn, patient_id)
    }
}

/// Read the CSV data rows.
///
/// The first row is always the header, whatever it contains.  Rows with fewer
/// than 3 fields, or with all fields empty, are skipped.  Fields past the
/// third are ignored.  A glucose level that is not a number is an error.
pub fn read_readings<R: Read>(rdr: R) -> Result<Vec<StagedReading>, ImportError> {
    parse_file(rdr).map(|(rows, _)| rows)
}

fn parse_file<R: Read>(rdr: R) -> Result<(Vec<StagedReading>, usize), ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr);

    let mut out: Vec<StagedReading> = Vec::new();
    let mut skipped = 0;
    for record in rdr.records().skip(1) {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        if record.len() < 3 || record.iter().all(|e| e.trim().is_empty()) {
            debug!("skipping row on line {}: {:?}", line, record);
            skipped += 1;
            continue;
        }
        let value = &record[1];
        let glucose_level =
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| ImportError::InvalidGlucoseLevel {
                    line,
                    value: value.to_string(),
                })?;
        out.push(StagedReading {
            patient_id: record[0].to_string(),
            glucose_level,
            status: record[2].to_string(),
        });
    }
    Ok((out, skipped))
}

pub fn create_table(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        r"
CREATE TABLE IF NOT EXISTS glucose_readings (
    reading_id INTEGER PRIMARY KEY,
    patient_id TEXT NOT NULL,
    glucose_level REAL NOT NULL,
    reading_time TEXT NOT NULL,
    status TEXT NOT NULL
);",
    )
}

pub fn query_readings(
    conn: &Connection,
    patient_id: Option<&str>,
) -> Result<Vec<GlucoseReadingRecord>, ImportError> {
    let mut stmt = conn.prepare(
        r"
SELECT rowid, CAST(patient_id AS TEXT), glucose_level, status, reading_time
FROM glucose_readings
WHERE ?1 IS NULL OR patient_id = ?1
ORDER BY rowid;",
    )?;
    let res = stmt
        .query_map(params![patient_id], |row| {
            Ok(GlucoseReadingRecord {
                reading_id: row.get(0)?,
                patient_id: row.get(1)?,
                glucose_level: row.get(2)?,
                status: row.get(3)?,
                reading_time: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<GlucoseReadingRecord>, rusqlite::Error>>()?;
    Ok(res)
}
