use std::process::Command;

use tempfile::tempdir;

fn publish() -> Command {
    let bin = env!("CARGO_BIN_EXE_hoist");
    let mut cmd = Command::new(bin);
    cmd.arg("publish")
        .env("AWS_REGION", "eu-west-2")
        .env("AWS_PROJECT_NAME", "Blog")
        .env("CLOUDFRONT_DISTRIBUTION_ID", "E123EXAMPLE");
    cmd
}

#[test]
fn test_publish_requires_project_name() {
    let dir = tempdir().unwrap();
    let output = publish()
        .current_dir(dir.path())
        .env_remove("AWS_PROJECT_NAME")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("AWS_PROJECT_NAME"),
        "stderr should name the missing variable; got:\n{}",
        stderr
    );
}

#[test]
fn test_publish_requires_distribution_id() {
    let dir = tempdir().unwrap();
    let output = publish()
        .current_dir(dir.path())
        .env_remove("CLOUDFRONT_DISTRIBUTION_ID")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CLOUDFRONT_DISTRIBUTION_ID"), "got:\n{}", stderr);
}

#[test]
fn test_publish_treats_empty_region_as_missing() {
    let dir = tempdir().unwrap();
    let output = publish()
        .current_dir(dir.path())
        .env("AWS_REGION", "")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("AWS_REGION"), "got:\n{}", stderr);
}
