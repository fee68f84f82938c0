use inventory::aggregate::{average_rows_per_group, summary_metrics};
use inventory::export::{to_csv, to_json};
use inventory::{filter, ingest, project, Field, InputFile, Predicate, Store, UserTableConfig};
use pretty_assertions::assert_eq;
use serde_json::json;

fn fixtures() -> Vec<InputFile> {
    vec![
        InputFile::new(
            "web-01.json",
            json!({
                "instance_id": "i-0a1",
                "instance_name": "web-01",
                "script_version": "2.1",
                "applications": [
                    {"name": "nginx", "type": "docker", "status": "running", "ports": [80, 443]},
                    {"name": "sshd", "type": "service", "status": "running", "ports": ["22"], "pids": [812]}
                ]
            })
            .to_string(),
        ),
        InputFile::new(
            "db-01.json",
            r#"{"instance_id": "i-0b2", "instance_name": "db-01", "applications": []}"#,
        ),
    ]
}

#[test]
fn ingest_persist_and_query() -> anyhow::Result<()> {
    let outcome = ingest(&fixtures());
    assert_eq!(outcome.dataset.len(), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.error_messages()[0].contains("'applications' list is empty"));

    let store = Store::open_in_memory()?;
    store.save_dataset(&outcome.dataset)?;
    let rows = store.load_dataset()?;
    assert_eq!(rows, outcome.dataset);

    let nginx = filter(&rows, &Predicate::search("NGINX"));
    assert_eq!(nginx.len(), 1);
    assert_eq!(nginx[0].ports, "80, 443");

    let metrics = summary_metrics(&rows);
    assert_eq!(metrics.total_instances, 1);
    assert_eq!(metrics.total_ports, 3);
    assert_eq!(average_rows_per_group(&[], Field::InstanceId), 0.0);

    let table = project(&nginx, &["app_name", "ports", "not_a_field"]);
    assert_eq!(to_csv(&table), "app_name,ports\nnginx,\"80, 443\"\n");
    assert_eq!(
        to_json(&table),
        "[\n  {\n    \"app_name\": \"nginx\",\n    \"ports\": \"80, 443\"\n  }\n]"
    );
    Ok(())
}

#[test]
fn saved_user_table_reapplies_to_reloaded_data() -> anyhow::Result<()> {
    let store = Store::open_in_memory()?;
    store.save_dataset(&ingest(&fixtures()).dataset)?;
    store.save_user_table_config(
        "services",
        &["instance_name".to_string(), "app_name".to_string()],
        json!({"app_type": "service"}).as_object().unwrap(),
        json!({"owner": "ops"}).as_object().unwrap(),
    )?;

    let config: UserTableConfig = store.load_user_table_config("services")?.unwrap();
    let table = config.apply(&store.load_dataset()?);
    assert_eq!(table.columns, vec!["instance_name", "app_name", "owner"]);
    assert_eq!(table.rows, vec![vec!["web-01", "sshd", "ops"]]);
    Ok(())
}
