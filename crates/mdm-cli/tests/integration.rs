#![allow(deprecated)]
use assert_cmd::Command;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn mdm(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mdm-orchestrate").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("MDM_URL")
        .env_remove("MDM_CLIENT_ID")
        .env("RUST_LOG", "warn");
    cmd
}

fn connected(dir: &TempDir, server: &Server) -> Command {
    let mut cmd = mdm(dir);
    cmd.args(["-p", &server.url(), "-c", "secret"]);
    cmd
}

fn mock_records(
    server: &mut Server,
    entity: &str,
    filter: Option<&str>,
    data: serde_json::Value,
) -> mockito::Mock {
    let matcher = match filter {
        Some(f) => Matcher::UrlEncoded("filter".into(), f.into()),
        None => Matcher::Any,
    };
    server
        .mock("GET", format!("/rest/v1/records/{entity}").as_str())
        .match_query(matcher)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "data": data }).to_string())
        .create()
}

// ---------------------------------------------------------------------------
// argument handling
// ---------------------------------------------------------------------------

#[test]
fn help_succeeds() {
    let dir = TempDir::new().unwrap();
    mdm(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--process-type"));
}

#[test]
fn missing_url_and_client_id_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    mdm(&dir)
        .args(["-n", "Nightly"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("PlatformUrl and ClientId are required"));
}

#[test]
fn missing_name_is_an_error() {
    let dir = TempDir::new().unwrap();
    mdm(&dir)
        .args(["-p", "http://127.0.0.1:9", "-c", "secret"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--name is required"));
}

#[test]
fn malformed_settings_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
    mdm(&dir)
        .args(["-n", "Nightly"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to load settings"));
}

#[test]
fn settings_file_supplies_connection() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    server
        .mock("GET", "/rest/v1/entities")
        .match_header("x-api-key", "from-file")
        .with_status(200)
        .with_body(r#"{"data": [], "TotalRecords": 0}"#)
        .create();
    std::fs::write(
        dir.path().join("settings.json"),
        json!({ "PlatformUrl": server.url(), "ClientId": "from-file" }).to_string(),
    )
    .unwrap();

    mdm(&dir)
        .arg("--test")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 0 entities."));
}

// ---------------------------------------------------------------------------
// --test
// ---------------------------------------------------------------------------

#[test]
fn test_connection_reports_entity_count() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    let entities = server
        .mock("GET", "/rest/v1/entities")
        .match_header("x-api-key", "secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": [{"Name": "Customer"}, {"Name": "Product"}], "TotalRecords": 2}"#)
        .create();

    connected(&dir, &server)
        .arg("--test")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 entities."));
    entities.assert();
}

#[test]
fn test_connection_unauthorized_fails() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    server
        .mock("GET", "/rest/v1/entities")
        .with_status(401)
        .create();

    connected(&dir, &server)
        .arg("-t")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Not Authorized"));
}

#[test]
fn rust_log_debug_enables_debug_events() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    server
        .mock("GET", "/rest/v1/entities")
        .with_status(200)
        .with_body(r#"{"data": [], "TotalRecords": 0}"#)
        .create();

    connected(&dir, &server)
        .env("RUST_LOG", "debug")
        .arg("--test")
        .assert()
        .success()
        .stderr(predicate::str::contains("calling platform"));
}

#[test]
fn rust_log_warn_suppresses_debug_and_info_events() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    server
        .mock("GET", "/rest/v1/entities")
        .with_status(200)
        .with_body(r#"{"data": [], "TotalRecords": 0}"#)
        .create();

    connected(&dir, &server)
        .arg("--test")
        .assert()
        .success()
        .stderr(predicate::str::contains("calling platform").not())
        .stderr(predicate::str::contains("No settings file found").not());
}

// ---------------------------------------------------------------------------
// orchestrations
// ---------------------------------------------------------------------------

#[test]
fn unknown_orchestration_exits_with_three() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    mock_records(&mut server, "Orchestration", None, json!([]));

    connected(&dir, &server)
        .args(["-n", "Missing"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("orchestration not found: Missing"));
}

#[test]
fn concurrent_orchestration_exits_with_three() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    mock_records(&mut server, "Orchestration", Some("[Code] eq 'z_Settings'"), json!([]));
    mock_records(
        &mut server,
        "Orchestration",
        Some("[Code] eq 'Nightly'"),
        json!([{ "Code": "Nightly", "Mode": "Concurrent", "Parameters": "{}" }]),
    );
    server
        .mock("PATCH", "/rest/v1/records/OrchestrationLog")
        .with_status(200)
        .with_body("{}")
        .create();

    connected(&dir, &server)
        .args(["-n", "Nightly"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Concurrent"));
}

#[test]
fn what_if_run_starts_no_jobs() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    mock_records(&mut server, "Orchestration", Some("[Code] eq 'z_Settings'"), json!([]));
    mock_records(
        &mut server,
        "Orchestration",
        Some("[Code] eq 'Nightly'"),
        json!([{
            "Code": "Nightly",
            "Mode": "Sequential",
            "ErrorHandling": "Abort",
            "Parameters": "{}"
        }]),
    );
    mock_records(
        &mut server,
        "OrchestrationStep",
        Some("[Orchestration] eq 'Nightly'"),
        json!([
            {
                "Code": "S1",
                "Name": "LoadCustomers",
                "StepNumber": 1,
                "ProcessType": "Connect",
                "Parameters": "{}"
            },
            {
                "Code": "S2",
                "Name": "MatchCustomers",
                "StepNumber": 2,
                "ProcessType": "Matching",
                "Parameters": "{}"
            }
        ]),
    );
    let logs = server
        .mock("PATCH", "/rest/v1/records/OrchestrationLog")
        .with_status(200)
        .with_body("{}")
        .expect_at_least(1)
        .create();
    let jobs = server
        .mock("POST", Matcher::Regex("^/rest/v1/(Connect|Matching)/".to_string()))
        .expect(0)
        .create();

    connected(&dir, &server)
        .args(["-n", "Nightly", "--whatif"])
        .assert()
        .success()
        .stdout(predicate::str::contains("what-if"))
        .stdout(predicate::str::contains("Orchestration 'Nightly' completed successfully."));

    logs.assert();
    jobs.assert();
}

#[test]
fn failed_step_exits_with_two() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    mock_records(&mut server, "Orchestration", Some("[Code] eq 'z_Settings'"), json!([]));
    mock_records(
        &mut server,
        "Orchestration",
        Some("[Code] eq 'Nightly'"),
        json!([{ "Code": "Nightly", "Parameters": "{}" }]),
    );
    mock_records(
        &mut server,
        "OrchestrationStep",
        None,
        json!([{
            "Code": "S1",
            "Name": "LoadCustomers",
            "StepNumber": 1,
            "ProcessType": "Connect",
            "Parameters": "{}"
        }]),
    );
    server
        .mock("PATCH", "/rest/v1/records/OrchestrationLog")
        .with_status(200)
        .with_body("{}")
        .create();
    server
        .mock("POST", "/rest/v1/Connect/strategies/LoadCustomers/Batch")
        .with_status(400)
        .with_body(r#"{"errors": ["unknown strategy"]}"#)
        .create();

    connected(&dir, &server)
        .args(["-n", "Nightly", "--json"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""error": true"#))
        .stderr(predicate::str::contains("aborted at step 'S1'"));
}

#[test]
fn ad_hoc_process_runs_to_completion() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new();
    mock_records(&mut server, "Orchestration", None, json!([]));
    server
        .mock("PATCH", "/rest/v1/records/OrchestrationLog")
        .with_status(200)
        .with_body("{}")
        .create();
    let start = server
        .mock("POST", "/rest/v1/Matching/MatchCustomers/processActions")
        .match_body(Matcher::Json(json!({ "Actions": ["IncludeSurvivorship"] })))
        .with_status(200)
        .with_body(r#"{"data": {}}"#)
        .create();
    server
        .mock("GET", "/rest/v1/Monitor/activities")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"data": [{"Name": "MatchCustomers", "Status": "Succeeded"}]}"#)
        .create();

    connected(&dir, &server)
        .args([
            "-n",
            "MatchCustomers",
            "-o",
            "Matching",
            "--parameters",
            r#"{"ProcessAction": "MatchingAndSurvivorship"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("MatchCustomers"))
        .stdout(predicate::str::contains("completed successfully"));
    start.assert();
}
