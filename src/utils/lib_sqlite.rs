use rusqlite::{params, Connection, OpenFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    /// The database file must already exist.
    ReadWrite,
    ReadWriteCreate,
}

impl AccessMode {
    fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            AccessMode::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
            AccessMode::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
            AccessMode::ReadWriteCreate => {
                base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        }
    }
}

/// Use this function to open a SQLite connection.  Foreign key enforcement
/// is switched on for the session, SQLite leaves it off by default.
pub fn open(db_path: &str, access_mode: AccessMode) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open_with_flags(db_path, access_mode.flags())?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

pub fn table_exists(conn: &Connection, table_name: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        params![table_name],
        |row| row.get(0),
    )
}
