use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("augsearch").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Learned data augmentation policy search"));
}

#[test]
fn test_cli_list() {
    let mut cmd = Command::cargo_bin("augsearch").unwrap();
    cmd.arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Available operations:"))
        .stdout(predicate::str::contains("ShearX"))
        .stdout(predicate::str::contains("Cutout"));
}

#[test]
fn test_cli_sample_random() {
    let mut cmd = Command::cargo_bin("augsearch").unwrap();
    let output = cmd
        .args(["sample", "--random", "--batch", "3", "--seed", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let policies: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let policies = policies.as_array().unwrap();
    assert_eq!(policies.len(), 3);
    assert!(policies[0].get("log_prob").is_none());
    assert_eq!(policies[0]["subpolicies"].as_array().unwrap().len(), 2);
}

#[test]
fn test_cli_sample_controller() {
    let mut cmd = Command::cargo_bin("augsearch").unwrap();
    let output = cmd
        .args(["sample", "--batch", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let policies: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let first = &policies.as_array().unwrap()[0];
    assert!(first["log_prob"].as_f64().unwrap() < 0.0);
    assert!(first["entropy"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_cli_sample_with_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("search.json");
    std::fs::write(
        &path,
        r#"{"controller": {"n_subpolicy": 5, "n_op": 1, "img_input": false}}"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("augsearch").unwrap();
    let output = cmd
        .args(["sample", "--batch", "1", "--config"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let policies: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let subpolicies = policies[0]["subpolicies"].as_array().unwrap();
    assert_eq!(subpolicies.len(), 5);
    assert_eq!(subpolicies[0].as_array().unwrap().len(), 1);
}

#[test]
fn test_cli_sample_rejects_zero_batch() {
    let mut cmd = Command::cargo_bin("augsearch").unwrap();
    cmd.args(["sample", "--random", "--batch", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--batch must be positive"));
}

#[test]
fn test_cli_demo_saves_checkpoints() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("augsearch").unwrap();
    cmd.args([
        "demo",
        "--updates",
        "4",
        "--batch",
        "4",
        "--save-every",
        "2",
        "--target-op",
        "rotate",
        "--checkpoint-dir",
    ])
    .arg(dir.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Target Rotate reward"));

    assert!(dir.path().join("controller_step_000004.json").exists());
    assert!(dir.path().join("controller_best.json").exists());

    // Resuming from the saved checkpoint and sampling from it
    let mut cmd = Command::cargo_bin("augsearch").unwrap();
    cmd.args(["sample", "--batch", "1", "--checkpoint"])
        .arg(dir.path().join("controller_step_000004.json"))
        .assert()
        .success();
}

#[test]
fn test_cli_demo_unknown_operation() {
    let mut cmd = Command::cargo_bin("augsearch").unwrap();
    cmd.args(["demo", "--updates", "1", "--target-op", "Mixup"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown operation"));
}
