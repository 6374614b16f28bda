//! End-to-end checks of the `certkeys` binary that need neither mkcert nor
//! the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("certkeys").unwrap();
        cmd.env("CERTKEYS_HOME", self.dir.path().join("store"))
            .env("CERTKEYS_CONFIG", self.dir.path().join("config.toml"))
            .env_remove("RUST_LOG")
            .arg("--no-color");
        cmd
    }
}

#[test]
fn help_lists_commands() {
    Sandbox::new()
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cert"))
        .stdout(predicate::str::contains("rootca"))
        .stdout(predicate::str::contains("tool"));
}

#[test]
fn config_path_follows_env() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_set_and_show() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "set", "output_format", "json"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"output_format\": \"json\""));
    sandbox
        .cmd()
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}

#[test]
fn add_list_show_remove() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["cert", "add", "web", "example.test", "127.0.0.1", "--subdomains"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 name(s)"));

    sandbox
        .cmd()
        .args(["-o", "json", "cert", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"identity\": \"web\""))
        .stdout(predicate::str::contains("example.test"));

    sandbox
        .cmd()
        .args(["cert", "show", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("example.test"))
        .stdout(predicate::str::contains("none"));

    sandbox
        .cmd()
        .args(["cert", "remove", "web", "127.0.0.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 name(s)"));

    assert!(sandbox.dir.path().join("store/custom/web").is_file());
}

#[test]
fn validity_is_persisted() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["cert", "add", "api", "api.test"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["cert", "validity", "api", "30"])
        .assert()
        .success();

    let text = std::fs::read_to_string(sandbox.dir.path().join("store/custom/api")).unwrap();
    assert!(text.contains("validity = 30"));
}

#[test]
fn read_without_generate_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["cert", "add", "web", "example.test"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["cert", "read", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn unknown_identity_is_reported() {
    Sandbox::new()
        .cmd()
        .args(["cert", "show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown identity: ghost"));
}

#[test]
fn delete_identity() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["cert", "add", "tmp", "tmp.test"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["cert", "delete", "tmp", "--purge"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted"));
    assert!(!sandbox.dir.path().join("store/custom/tmp").exists());
}

#[test]
fn verbose_logs_dispatch() {
    Sandbox::new()
        .cmd()
        .args(["-v", "config", "path"])
        .assert()
        .success()
        .stderr(predicate::str::contains("dispatching command"));
}
