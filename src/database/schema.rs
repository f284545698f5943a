/*!
 * Database schema definitions and migrations.
 *
 * This module contains the SQL schema for the course content tables
 * and handles schema migrations for version upgrades.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating database schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        debug!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all database tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS modules (
            id INTEGER PRIMARY KEY,
            module_number INTEGER NOT NULL,
            name TEXT NOT NULL,
            subjects_number INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_modules_number ON modules(module_number);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            slides_number INTEGER NOT NULL DEFAULT 0
        );
        "#,
    )?;

    // formatted_content stays NULL until the text pass has run
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS slides (
            id INTEGER PRIMARY KEY,
            subject_id INTEGER NOT NULL,
            lesson_number INTEGER NOT NULL DEFAULT 0,
            name TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            formatted_content TEXT,
            module_id INTEGER REFERENCES modules(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_slides_module ON slides(module_id);
        CREATE INDEX IF NOT EXISTS idx_slides_subject ON slides(subject_id);
        CREATE INDEX IF NOT EXISTS idx_slides_lesson ON slides(lesson_number);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS attachments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            file TEXT NOT NULL,
            autostart INTEGER NOT NULL DEFAULT 0,
            slide_id INTEGER NOT NULL REFERENCES slides(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_attachments_slide ON attachments(slide_id);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS audio_dubbings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            audio TEXT NOT NULL,
            slide_id INTEGER NOT NULL REFERENCES slides(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_audio_dubbings_slide ON audio_dubbings(slide_id);
        "#,
    )?;

    info!("Database schema created successfully");
    Ok(())
}

/// Migrate the schema from one version to another
fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
    if from_version < SCHEMA_VERSION {
        return Err(anyhow::anyhow!(
            "Unknown schema version: {}. Cannot migrate.",
            from_version
        ));
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    info!("Schema migration completed to v{}", SCHEMA_VERSION);
    Ok(())
}
