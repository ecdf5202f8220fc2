use std::env;

use crate::error::ImportError;

use super::glucose_readings_archive::GlucoseReadingsArchive;

pub const CSV_PATH_VAR: &str = "GLUCOSE_CSV_PATH";
pub const DB_PATH_VAR: &str = "GLUCOSE_DB_PATH";

pub struct ProdDb {}

impl ProdDb {
    /// Paths come from the `GLUCOSE_CSV_PATH` and `GLUCOSE_DB_PATH` environment
    /// variables, usually set in `.env/{env}.env`.
    pub fn glucose_readings() -> Result<GlucoseReadingsArchive, ImportError> {
        ProdDb::glucose_readings_from(None, None)
    }

    /// Same as [ProdDb::glucose_readings] but an explicit path wins over the
    /// environment.
    pub fn glucose_readings_from(
        csv_path: Option<String>,
        db_path: Option<String>,
    ) -> Result<GlucoseReadingsArchive, ImportError> {
        Ok(GlucoseReadingsArchive {
            csv_path: ProdDb::csv_path(csv_path)?,
            db_path: ProdDb::db_path(db_path)?,
            create_table: false,
        })
    }

    pub fn csv_path(path: Option<String>) -> Result<String, ImportError> {
        path.map_or_else(|| env_var(CSV_PATH_VAR), Ok)
    }

    pub fn db_path(path: Option<String>) -> Result<String, ImportError> {
        path.map_or_else(|| env_var(DB_PATH_VAR), Ok)
    }
}

fn env_var(name: &str) -> Result<String, ImportError> {
    env::var(name).map_err(|e| ImportError::Config(format!("{}: {}", name, e)))
}
