use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The glucose level on a data row is not a number.  Aborts the whole run.
    #[error("invalid glucose level {value:?} on line {line}")]
    InvalidGlucoseLevel { line: u64, value: String },

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),
}
