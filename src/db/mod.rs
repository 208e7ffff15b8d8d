pub mod migrations;
pub mod queries;

use std::sync::{Arc, Mutex};

use anyhow::Context;
use rusqlite::Connection;

pub type Db = Arc<Mutex<Connection>>;

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {path}"))?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}
