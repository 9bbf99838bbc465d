//! Smoke tests -- verify the binary runs and its subcommands parse.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("testpulse")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Webhook-driven dashboard"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("testpulse")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("testpulse"));
}

#[test]
fn test_serve_subcommand_exists() {
    Command::cargo_bin("testpulse")
        .unwrap()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--path-prefix"));
}

#[test]
fn test_summary_on_empty_database() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("db.sqlite");

    Command::cargo_bin("testpulse")
        .unwrap()
        .arg("summary")
        .arg("--db-path")
        .arg(&db_path)
        .assert()
        .success()
        .stdout(predicates::str::contains("No test results recorded."));
}

#[test]
fn test_summary_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("db.sqlite");

    {
        let pool = testpulse::storage::open_pool(&db_path).unwrap();
        let conn = pool.get().unwrap();
        for status in ["success", "fail"] {
            testpulse::storage::runs::insert_run(
                &conn,
                &testpulse::storage::NewTestRun::new("web", status),
            )
            .unwrap();
        }
    }

    Command::cargo_bin("testpulse")
        .unwrap()
        .args(["summary", "--json", "--db-path"])
        .arg(&db_path)
        .assert()
        .success()
        .stdout(predicates::str::contains("\"total_runs\": 2"))
        .stdout(predicates::str::contains("\"latest_status\": \"fail\""));
}
