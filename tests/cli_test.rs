//! CLI integration tests for the swagger-tester binary.

use assert_cmd::Command;
use mockito::Server;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const TEST_SCHEMA_PATH: &str = "tests/fixtures/test_schema.json";

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("swagger-tester"))
}

// Helper to create a temp file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod list_command {
    use super::*;

    #[test]
    fn lists_operations_and_parameters() {
        cmd()
            .args(["list", TEST_SCHEMA_PATH])
            .assert()
            .success()
            .stdout(predicate::str::contains("GET /apps/{appid}"))
            .stdout(predicate::str::contains("appid: string (path, required)"))
            .stdout(predicate::str::contains("limit: integer (query)"))
            .stdout(predicate::str::contains("3 paths, 4 operations"));
    }

    #[test]
    fn lists_unsupported_parameters() {
        cmd()
            .args(["list", TEST_SCHEMA_PATH])
            .assert()
            .success()
            .stdout(predicate::str::contains("warning[W001]: app: unsupported schema parameter"));
    }

    #[test]
    fn list_json() {
        let output = cmd()
            .args(["list", TEST_SCHEMA_PATH, "--json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(
            value["/apps/{appid}"]["get"]["parameters"]["appid"]["type"],
            "string"
        );
        assert_eq!(value["/apps/{appid}"]["get"]["operationId"], "getApp");
        assert_eq!(value["/apps/{appid}"]["put"]["diagnostics"][0]["code"], "W001");
    }

    #[test]
    fn list_file_not_found() {
        cmd()
            .args(["list", "/nonexistent/swagger.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn list_not_a_schema_document() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", r#"{"type": "object"}"#);

        cmd()
            .args(["list", schema.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid schema document"));
    }
}

mod run_command {
    use super::*;

    fn mock_apps(server: &mut Server, list_status: usize) -> Vec<mockito::Mock> {
        vec![
            server.mock("GET", "/api/schema").with_status(200).create(),
            server
                .mock("GET", "/api/apps")
                .with_status(list_status)
                .create(),
            server
                .mock("GET", "/api/apps/test_string")
                .with_status(404)
                .create(),
        ]
    }

    #[test]
    fn run_all_passing() {
        let mut server = Server::new();
        let _mocks = mock_apps(&mut server, 200);

        cmd()
            .args([
                "run",
                TEST_SCHEMA_PATH,
                "--base-url",
                &format!("{}/api", server.url()),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("PASS GET /apps/{appid} [404]"))
            .stdout(predicate::str::contains("SKIP PUT /apps/{appid}"))
            .stdout(predicate::str::contains(
                "4 operations: 3 passed, 0 failed, 1 skipped",
            ));
    }

    #[test]
    fn run_with_failure_exits_1() {
        let mut server = Server::new();
        let _mocks = mock_apps(&mut server, 500);

        cmd()
            .args([
                "run",
                TEST_SCHEMA_PATH,
                "--base-url",
                &format!("{}/api", server.url()),
            ])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("FAIL GET /apps [500]"));
    }

    #[test]
    fn run_json_output() {
        let mut server = Server::new();
        let _mocks = mock_apps(&mut server, 200);

        let output = cmd()
            .args([
                "run",
                TEST_SCHEMA_PATH,
                "--base-url",
                &format!("{}/api", server.url()),
                "--json",
            ])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["passed"], 3);
        assert_eq!(value["failed"], 0);
        assert_eq!(value["skipped"], 1);
        assert_eq!(value["results"][3]["outcome"], "skipped");
    }

    #[test]
    fn run_sends_headers_and_fixtures() {
        let dir = TempDir::new().unwrap();
        let fixtures = write_temp_file(
            &dir,
            "fixtures.json",
            r#"{"GET /apps/{appid}": {"appid": "known"}}"#,
        );

        let mut server = Server::new();
        let _schema = server
            .mock("GET", "/api/schema")
            .match_header("x-api-key", "secret")
            .with_status(200)
            .create();
        let _list = server
            .mock("GET", "/api/apps")
            .match_header("x-api-key", "secret")
            .with_status(200)
            .create();
        let app = server
            .mock("GET", "/api/apps/known")
            .match_header("x-api-key", "secret")
            .with_status(200)
            .create();

        cmd()
            .args([
                "run",
                TEST_SCHEMA_PATH,
                "--base-url",
                &format!("{}/api", server.url()),
                "--header",
                "X-Api-Key: secret",
                "--fixtures",
                fixtures.to_str().unwrap(),
            ])
            .assert()
            .success();
        app.assert();
    }

    #[test]
    fn run_unreachable_api_fails() {
        cmd()
            .args(["run", TEST_SCHEMA_PATH, "--base-url", "http://127.0.0.1:9/api"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("3 failed"));
    }

    #[test]
    fn run_invalid_header_flag() {
        cmd()
            .args(["run", TEST_SCHEMA_PATH, "--header", "no-colon"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("expected NAME:VALUE"));
    }

    #[test]
    fn run_unknown_auth_scheme() {
        cmd()
            .args(["run", TEST_SCHEMA_PATH, "--auth", "oauth=token"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown security scheme 'oauth'"));
    }

    #[test]
    fn run_json_error_output() {
        cmd()
            .args(["run", "/nonexistent/swagger.json", "--json"])
            .assert()
            .code(3)
            .stdout(predicate::str::contains(r#""ok":false"#));
    }
}
