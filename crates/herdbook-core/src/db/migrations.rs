//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    debug_assert!(version <= CURRENT_VERSION);
    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: Initial schema
async fn migrate_v1(conn: &Connection) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    // Using a transaction for atomicity

    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        // Herds
        "CREATE TABLE IF NOT EXISTS herds (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_herds_name ON herds(name)",
        // Animals
        "CREATE TABLE IF NOT EXISTS animals (
            id TEXT PRIMARY KEY,
            ear_tag TEXT NOT NULL UNIQUE,
            sex TEXT NOT NULL,
            breed TEXT NOT NULL DEFAULT '',
            date_of_birth TEXT NOT NULL,
            herd_id TEXT REFERENCES herds(id),
            status TEXT NOT NULL DEFAULT 'active',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_animals_herd ON animals(herd_id)",
        "CREATE INDEX IF NOT EXISTS idx_animals_updated ON animals(updated_at DESC)",
        // Herd assignments
        "CREATE TABLE IF NOT EXISTS herd_assignments (
            id TEXT PRIMARY KEY,
            animal_id TEXT NOT NULL REFERENCES animals(id),
            herd_id TEXT NOT NULL REFERENCES herds(id),
            assigned_at TEXT NOT NULL,
            removed_at TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_assignments_animal ON herd_assignments(animal_id)",
        // Breeding events (sire_ids is a JSON array of animal ids)
        "CREATE TABLE IF NOT EXISTS breeding_events (
            id TEXT PRIMARY KEY,
            animal_id TEXT NOT NULL REFERENCES animals(id),
            sire_ids TEXT NOT NULL DEFAULT '[]',
            method TEXT NOT NULL,
            service_date TEXT NOT NULL,
            preg_check_date TEXT,
            preg_check_result TEXT,
            created_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_breeding_animal ON breeding_events(animal_id)",
        // Calving events (calf_id intentionally unconstrained: the calf's
        // own record may be registered later or archived independently)
        "CREATE TABLE IF NOT EXISTS calving_events (
            id TEXT PRIMARY KEY,
            dam_id TEXT NOT NULL REFERENCES animals(id),
            calf_id TEXT,
            breeding_event_id TEXT NOT NULL REFERENCES breeding_events(id),
            calving_date TEXT NOT NULL,
            assisted INTEGER NOT NULL DEFAULT 0,
            calf_sex TEXT,
            birth_weight_kg REAL
        )",
        "CREATE INDEX IF NOT EXISTS idx_calving_dam ON calving_events(dam_id)",
        // Health events
        "CREATE TABLE IF NOT EXISTS health_events (
            id TEXT PRIMARY KEY,
            animal_id TEXT NOT NULL REFERENCES animals(id),
            event_type TEXT NOT NULL,
            date TEXT NOT NULL,
            product TEXT,
            dosage TEXT,
            withdrawal_end TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_health_animal ON health_events(animal_id)",
        // Weight records
        "CREATE TABLE IF NOT EXISTS weight_records (
            id TEXT PRIMARY KEY,
            animal_id TEXT NOT NULL REFERENCES animals(id),
            date TEXT NOT NULL,
            weight_kg REAL NOT NULL,
            note TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_weights_animal ON weight_records(animal_id)",
        // Photos
        "CREATE TABLE IF NOT EXISTS photos (
            id TEXT PRIMARY KEY,
            animal_id TEXT NOT NULL REFERENCES animals(id),
            angle TEXT NOT NULL,
            location TEXT NOT NULL,
            captured_at INTEGER NOT NULL,
            latitude REAL,
            longitude REAL
        )",
        "CREATE INDEX IF NOT EXISTS idx_photos_animal ON photos(animal_id)",
        // Farm settings singleton (contacts is a JSON array)
        "CREATE TABLE IF NOT EXISTS farm_settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            farm_name TEXT NOT NULL DEFAULT '',
            address TEXT,
            contacts TEXT NOT NULL DEFAULT '[]',
            gestation_length_days INTEGER NOT NULL,
            weaning_age_days INTEGER NOT NULL,
            breeding_alert_days INTEGER NOT NULL,
            withdrawal_alert_days INTEGER NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT 0
        )",
        // Sync metadata (local only, never uploaded)
        "CREATE TABLE IF NOT EXISTS sync_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        // Record migration version
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for statement in statements {
        conn.execute(statement, ()).await?;
    }

    conn.execute("COMMIT", ()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn open_conn() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_is_idempotent() {
        let conn = open_conn().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_v1_creates_all_tables() {
        let conn = open_conn().await;
        run(&conn).await.unwrap();

        for table in [
            "herds",
            "animals",
            "herd_assignments",
            "breeding_events",
            "calving_events",
            "health_events",
            "weight_records",
            "photos",
            "farm_settings",
            "sync_meta",
        ] {
            let mut rows = conn
                .query(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
                    [table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap().unwrap();
            assert_eq!(row.get::<i32>(0).unwrap(), 1, "missing table {table}");
        }
    }
}
