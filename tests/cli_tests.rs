use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn kiosk(catalog_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kiosk").unwrap();
    cmd.arg("--catalog")
        .arg(catalog_dir.path().join("catalog.json"))
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_init_then_preview_hides_disabled_buttons() {
    let dir = TempDir::new().unwrap();
    kiosk(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote sample catalog"));

    kiosk(&dir)
        .arg("preview")
        .assert()
        .success()
        .stdout(predicate::str::contains("Visit Employee"))
        .stdout(predicate::str::contains("Food Delivery"))
        .stdout(predicate::str::contains("All Hands").not());

    kiosk(&dir).arg("init").assert().failure();
}

#[test]
fn test_resolve_lists_steps() {
    let dir = TempDir::new().unwrap();
    kiosk(&dir).arg("init").assert().success();

    kiosk(&dir)
        .args(["resolve", "food delivery"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Courier"))
        .stdout(predicate::str::contains("2. Who is it for?"))
        .stdout(predicate::str::contains("3. Success"));
}

#[test]
fn test_scripted_delivery_check_in() {
    let dir = TempDir::new().unwrap();
    kiosk(&dir).arg("init").assert().success();

    kiosk(&dir)
        .args([
            "check-in",
            "Food Delivery",
            "--set",
            "courier=DoorDash",
            "--set",
            "recipient=Kim",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Checked in"))
        .stdout(predicate::str::contains("Notified: front-desk@example.com"));
}

#[test]
fn test_check_in_stops_on_missing_values() {
    let dir = TempDir::new().unwrap();
    kiosk(&dir).arg("init").assert().success();

    kiosk(&dir)
        .args(["check-in", "Visit Employee", "--set", "fullName=Ada"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("host required"));
}

#[test]
fn test_preview_without_catalog_fails() {
    let dir = TempDir::new().unwrap();
    kiosk(&dir)
        .arg("preview")
        .assert()
        .failure()
        .stderr(predicate::str::contains("kiosk init"));
}
