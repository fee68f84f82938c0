use std::path::{Path, PathBuf};

use assert_cmd::Command;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../support/test-fixtures")
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).to_string_lossy().to_string()
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Workspace {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn db(&self) -> PathBuf {
        self.dir.path().join("dashboard_data.db")
    }

    fn inventory(&self) -> Command {
        let mut cmd = Command::cargo_bin("inventory").unwrap();
        cmd.env("INVENTORY_STATEDB_FS_PATH", self.db())
            .env_remove("INVENTORY_DEBUG")
            .env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> String {
        let output = self.inventory().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "inventory {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }

    fn ingest_fixtures(&self) -> String {
        let root = fixtures_dir().to_string_lossy().to_string();
        self.run(&["ingest", "-r", root.as_str(), "--save"])
    }
}

#[test]
fn ingest_reports_errors_and_saves_valid_rows() {
    let ws = Workspace::new();
    let stdout = ws.ingest_fixtures();
    assert!(stdout.contains("Error processing empty-applications.json: 'applications' list is empty"));
    assert!(stdout.contains("Error processing malformed.json: Invalid JSON format at line"));
    assert!(stdout.contains("saved 3 rows to"));
    assert!(ws.db().is_file());

    let csv = ws.run(&["query", "--columns", "instance_name,app_name", "--format", "csv"]);
    assert_eq!(
        csv,
        "instance_name,app_name\ndb-01,postgres\nweb-01,nginx\nweb-01,sshd\n"
    );
}

#[test]
fn ingest_without_valid_files_fails_and_leaves_store_alone() {
    let ws = Workspace::new();
    let malformed = fixture("malformed.json");
    ws.inventory()
        .args(["ingest", "-f", malformed.as_str(), "--save"])
        .assert()
        .failure();
    assert!(!ws.db().exists());
}

#[test]
fn ingest_lists_errors_in_the_order_files_were_given() {
    let ws = Workspace::new();
    let missing = ws.dir.path().join("missing.json").to_string_lossy().to_string();
    let malformed = fixture("malformed.json");
    let web = fixture("web-01.json");
    let stdout = ws.run(&[
        "ingest",
        "-f",
        missing.as_str(),
        "-f",
        malformed.as_str(),
        "-f",
        web.as_str(),
    ]);
    let missing_at = stdout.find("Error processing").unwrap();
    assert!(stdout[missing_at..].starts_with(&format!("Error processing {}:", missing)));
    assert!(stdout.find("Error processing malformed.json").unwrap() > missing_at);
}

#[test]
fn types_counts_and_matrix() {
    let ws = Workspace::new();
    ws.ingest_fixtures();
    assert_eq!(
        ws.run(&["types", "--format", "csv"]),
        "app_type,applications\nservice,2\ndocker,1\n"
    );
    assert_eq!(
        ws.run(&["types", "--top", "1", "--format", "csv"]),
        "app_type,applications\nservice,2\n"
    );
    assert_eq!(
        ws.run(&["types", "--matrix", "--format", "csv"]),
        "instance_name,service,docker\ndb-01,1,0\nweb-01,1,1\n"
    );
}

#[test]
fn query_search_filter_and_json_output() {
    let ws = Workspace::new();
    ws.ingest_fixtures();

    let stdout = ws.run(&[
        "query",
        "--search",
        "NGINX",
        "--columns",
        "app_name,ports,container_id",
        "--format",
        "json",
    ]);
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        rows,
        serde_json::json!([{"app_name": "nginx", "ports": "8080:80, 443", "container_id": "3f2a9c1b7d"}])
    );

    let stdout = ws.run(&[
        "query",
        "--where",
        "app_type=service",
        "--where",
        "instance_name=db-01",
        "--columns",
        "app_name",
        "--format",
        "csv",
    ]);
    assert_eq!(stdout, "app_name\npostgres\n");
}

#[test]
fn summary_json_reports_metrics() {
    let ws = Workspace::new();
    ws.ingest_fixtures();
    let stdout = ws.run(&["summary", "--json"]);
    let metrics: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(metrics["total_instances"], 2);
    assert_eq!(metrics["total_applications"], 3);
    assert_eq!(metrics["unique_app_types"], 2);
    assert_eq!(metrics["avg_apps_per_instance"], 1.5);
    assert_eq!(metrics["total_ports"], 4);
}

#[test]
fn reading_commands_do_not_create_a_database() {
    let ws = Workspace::new();
    let stdout = ws.run(&["summary", "--json"]);
    let metrics: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(metrics["total_applications"], 0);
    assert_eq!(metrics["avg_apps_per_instance"], 0.0);
    ws.run(&["user-tables", "rm", "never-existed"]);
    ws.run(&["custom-tables", "rm", "never-existed"]);
    assert!(!ws.db().exists());
}

#[test]
fn user_table_round_trip() {
    let ws = Workspace::new();
    ws.ingest_fixtures();
    ws.run(&[
        "user-tables",
        "save",
        "services",
        "--columns",
        "instance_name,app_name",
        "--where",
        "app_type=service",
        "--custom-column",
        "wave=2",
    ]);
    let stdout = ws.run(&["user-tables", "show", "services", "--format", "csv"]);
    assert_eq!(
        stdout,
        "instance_name,app_name,wave\ndb-01,postgres,2\nweb-01,sshd,2\n"
    );

    let stdout = ws.run(&["user-tables", "rm", "services"]);
    assert!(stdout.contains("deleted user table 'services'"));
    ws.inventory()
        .args(["user-tables", "show", "services"])
        .assert()
        .failure();
}

#[test]
fn custom_table_editing() {
    let ws = Workspace::new();
    ws.run(&["custom-tables", "create", "t1", "--columns", "App,Owner", "--rows", "1"]);
    ws.inventory()
        .args(["custom-tables", "create", "t1", "--columns", "App"])
        .assert()
        .failure();

    ws.run(&["custom-tables", "set-cell", "t1", "--row", "0", "--column", "App", "--value", "nginx"]);
    ws.run(&["custom-tables", "add-column", "t1", "Wave"]);
    ws.run(&["custom-tables", "add-row", "t1"]);
    ws.run(&["custom-tables", "drop-column", "t1", "Owner"]);
    ws.inventory()
        .args(["custom-tables", "set-cell", "t1", "--row", "9", "--column", "App", "--value", "x"])
        .assert()
        .failure();

    let stdout = ws.run(&["custom-tables", "export", "t1", "--format", "csv"]);
    assert_eq!(stdout, "App,Wave\nnginx,\n,\n");

    let stdout = ws.run(&["custom-tables", "ls"]);
    assert!(stdout.contains("t1"));
}

#[test]
fn custom_table_from_template() {
    let ws = Workspace::new();
    ws.ingest_fixtures();
    ws.run(&[
        "custom-tables",
        "from-template",
        "migration",
        "--columns",
        "instance_name,app_name",
        "--app-type",
        "docker",
        "--custom-column",
        "Target",
    ]);
    let stdout = ws.run(&["custom-tables", "export", "migration", "--format", "csv"]);
    assert_eq!(stdout, "instance_name,app_name,Target\nweb-01,nginx,\n");
}

#[test]
fn admin_clear_requires_confirmation() {
    let ws = Workspace::new();
    ws.ingest_fixtures();
    ws.inventory().args(["admin", "clear"]).assert().failure();
    assert_eq!(
        ws.run(&["query", "--format", "csv", "--columns", "app_name"]),
        "app_name\npostgres\nnginx\nsshd\n"
    );

    ws.run(&["admin", "clear", "--yes"]);
    assert_eq!(
        ws.run(&["query", "--format", "csv", "--columns", "app_name"]),
        "app_name\n"
    );
}

#[test]
fn admin_init_creates_a_migrated_database() {
    let ws = Workspace::new();
    let stdout = ws.run(&["admin", "init"]);
    assert!(stdout.contains("schema version 4"));
    assert!(ws.db().is_file());
}
