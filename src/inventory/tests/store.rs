use indoc::indoc;
use inventory::persist::SCHEMA_VERSION;
use inventory::{ingest, ApplicationRow, CustomTable, InputFile, InventoryError, Store};
use pretty_assertions::assert_eq;
use rusqlite::Connection;
use serde_json::{json, Map, Value};
use tempfile::tempdir;

fn row(instance: &str, app: &str, ports: &str) -> ApplicationRow {
    ApplicationRow {
        instance_id: format!("i-{}", instance),
        instance_name: instance.to_string(),
        script_version: "1.2".to_string(),
        app_name: app.to_string(),
        app_type: "service".to_string(),
        app_status: "running".to_string(),
        ports: ports.to_string(),
        pids: "101, 102".to_string(),
        process_name: app.to_string(),
        ..Default::default()
    }
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn dataset_survives_reopen() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("dashboard_data.db");
    let db = db.to_str().unwrap();
    assert!(!Store::exists(db));

    let rows = vec![row("web", "nginx", "80, 443"), row("db", "postgres", "5432")];
    {
        let store = Store::open(db)?;
        assert_eq!(store.save_dataset(&rows)?, 2);
    }
    assert!(Store::exists(db));

    let store = Store::open(db)?;
    assert_eq!(store.load_dataset()?, rows);

    // a second save replaces the snapshot
    store.save_dataset(&rows[1..])?;
    assert_eq!(store.load_dataset()?, rows[1..].to_vec());
    Ok(())
}

#[test]
fn user_table_configs_replace_by_name() -> anyhow::Result<()> {
    let store = Store::open_in_memory()?;
    let columns = vec!["app_name".to_string(), "instance_name".to_string()];
    store.save_user_table_config(
        "docker-apps",
        &columns,
        &object(json!({"app_type": "docker"})),
        &Map::new(),
    )?;
    store.save_user_table_config(
        "docker-apps",
        &columns[..1],
        &object(json!({"app_type": ["docker", "podman"]})),
        &object(json!({"wave": "2"})),
    )?;

    let configs = store.load_all_user_table_configs()?;
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].columns, vec!["app_name"]);
    assert_eq!(configs[0].filters, object(json!({"app_type": ["docker", "podman"]})));
    assert_eq!(configs[0].custom_columns, object(json!({"wave": "2"})));
    assert!(configs[0].created_at.is_some());

    assert!(store.delete_user_table_config("docker-apps")?);
    assert!(!store.delete_user_table_config("docker-apps")?);
    assert!(!store.delete_user_table_config("never-existed")?);
    assert!(store.load_user_table_config("docker-apps")?.is_none());
    Ok(())
}

#[test]
fn custom_table_round_trip_keeps_created_at() -> anyhow::Result<()> {
    let store = Store::open_in_memory()?;
    let mut table = CustomTable::empty("t1", vec!["App".to_string(), "Owner".to_string()], 1)?;
    table.set_cell(0, "App", "nginx")?;

    let first = store.save_custom_table("t1", &table)?;
    let created_at = first.created_at.clone();
    assert!(created_at.is_some());

    let loaded = store.load_custom_table("t1")?.unwrap();
    assert_eq!(loaded.columns, vec!["App", "Owner"]);
    assert_eq!(loaded.data, vec![vec!["nginx", ""]]);
    assert_eq!(loaded.created_at, created_at);

    let mut edited = loaded.clone();
    edited.add_row();
    // a caller-supplied created_at never overrides the stored one
    edited.created_at = Some("1999-01-01 00:00:00".to_string());
    let second = store.save_custom_table("t1", &edited)?;
    assert_eq!(second.created_at, created_at);
    assert!(second.updated_at.is_some());

    let tables = store.load_all_custom_tables()?;
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].data.len(), 2);
    assert_eq!(tables[0].created_at, created_at);

    assert!(store.delete_custom_table("t1")?);
    assert!(!store.delete_custom_table("t1")?);
    assert!(store.load_all_custom_tables()?.is_empty());
    Ok(())
}

#[test]
fn ragged_custom_tables_are_repaired() -> anyhow::Result<()> {
    let store = Store::open_in_memory()?;
    let ragged = CustomTable {
        table_name: "ragged".to_string(),
        columns: vec!["a".to_string(), "b".to_string()],
        data: vec![vec!["1".to_string()], vec!["1".to_string(), "2".to_string(), "3".to_string()]],
        ..Default::default()
    };
    let saved = store.save_custom_table("ragged", &ragged)?;
    assert!(saved.is_rectangular());
    assert_eq!(
        store.load_custom_table("ragged")?.unwrap().data,
        vec![vec!["1", ""], vec!["1", "2"]]
    );
    Ok(())
}

#[test]
fn bracketed_port_text_survives_save_and_load() -> anyhow::Result<()> {
    let files = vec![InputFile::new(
        "bastion.json",
        json!({
            "instance_id": "i-0c3",
            "instance_name": "bastion",
            "applications": [
                {"name": "sshd", "type": "service", "ports": ["[::]:22"]},
                {"name": "nginx", "type": "service", "ports": ["[::]:80", "0.0.0.0:80"]},
                {"name": "agent", "type": "service", "ports": ["{dynamic}"]}
            ]
        })
        .to_string(),
    )];
    let outcome = ingest(&files);
    assert!(outcome.errors.is_empty());

    let store = Store::open_in_memory()?;
    store.save_dataset(&outcome.dataset)?;
    let loaded = store.load_dataset()?;
    assert_eq!(loaded, outcome.dataset);
    let ports: Vec<&str> = loaded.iter().map(|r| r.ports.as_str()).collect();
    assert_eq!(ports, vec!["[::]:22", "[::]:80, 0.0.0.0:80", "{dynamic}"]);
    Ok(())
}

#[test]
fn clear_all_empties_every_record_set() -> anyhow::Result<()> {
    let store = Store::open_in_memory()?;
    store.save_dataset(&[row("web", "nginx", "80")])?;
    store.save_user_table_config("v", &[], &Map::new(), &Map::new())?;
    store.save_custom_table("t", &CustomTable::empty("t", vec!["a".to_string()], 0)?)?;

    store.clear_all()?;
    assert!(store.load_dataset()?.is_empty());
    assert!(store.load_all_user_table_configs()?.is_empty());
    assert!(store.load_all_custom_tables()?.is_empty());
    Ok(())
}

#[test]
fn legacy_database_is_migrated_in_place() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("legacy.db");
    {
        let conn = Connection::open(&db)?;
        conn.execute_batch(indoc! {"
            CREATE TABLE application_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instance_id TEXT,
                instance_name TEXT,
                app_name TEXT,
                app_type TEXT,
                app_status TEXT,
                app_image TEXT,
                ports TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE user_tables (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                table_name TEXT UNIQUE,
                columns TEXT,
                filters TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO application_data (instance_id, instance_name, app_name, app_type, app_status, app_image, ports)
            VALUES ('i-1', 'web', 'nginx', 'docker', 'running', 'nginx:1.25', '[80, 443]');
            INSERT INTO user_tables (table_name, columns, filters)
            VALUES ('old', '[\"app_name\"]', '{\"app_type\": \"docker\"}');"})?;
    }

    let store = Store::open(db.to_str().unwrap())?;
    assert_eq!(store.schema_version()?, SCHEMA_VERSION);

    let rows = store.load_dataset()?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].ports, "80, 443");
    assert_eq!(rows[0].app_image, "nginx:1.25");
    assert_eq!(rows[0].pids, "");
    assert_eq!(rows[0].container_id, "");

    let configs = store.load_all_user_table_configs()?;
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].table_name, "old");
    assert!(configs[0].custom_columns.is_empty());

    assert!(store.load_all_custom_tables()?.is_empty());
    Ok(())
}

#[test]
fn garbage_file_is_reported_as_corruption() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("not-a-db.db");
    std::fs::write(&db, vec![0x42u8; 4096])?;
    let err = Store::open(db.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, InventoryError::StoreCorruption(_)), "{:?}", err);
    Ok(())
}
