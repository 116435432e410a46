use std::process::Command;

use tempfile::tempdir;

/// Invocation with every required variable set but nothing that could reach
/// AWS: failures under test happen before any client is built.
fn provision(args: &[&str]) -> Command {
    let bin = env!("CARGO_BIN_EXE_hoist");
    let mut cmd = Command::new(bin);
    cmd.arg("provision")
        .args(args)
        .env("AWS_REGION", "eu-west-2")
        .env("AWS_STACK", "blog-site")
        .env("DOMAIN", "blog.example.com")
        .env_remove("GITHUB_ACTIONS");
    cmd
}

#[test]
fn test_provision_rejects_unknown_phase() {
    let dir = tempdir().unwrap();
    let output = provision(&["--phase", "teardown"])
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unknown phase 'teardown'"),
        "stderr should name the bad phase; got:\n{}",
        stderr
    );
}

#[test]
fn test_provision_requires_region() {
    let dir = tempdir().unwrap();
    let output = provision(&["--phase", "init"])
        .current_dir(dir.path())
        .env_remove("AWS_REGION")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("AWS_REGION"),
        "stderr should name the missing variable; got:\n{}",
        stderr
    );
}

#[test]
fn test_provision_requires_domain() {
    let dir = tempdir().unwrap();
    let output = provision(&["--phase", "init"])
        .current_dir(dir.path())
        .env_remove("DOMAIN")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DOMAIN"), "got:\n{}", stderr);
}

#[test]
fn test_provision_reports_missing_templates() {
    // Config and phase are valid, so the next failure is the template read
    let dir = tempdir().unwrap();
    let output = provision(&["--phase", "init"])
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("template.yaml"),
        "stderr should name the missing template; got:\n{}",
        stderr
    );
}

#[test]
fn test_provision_requires_phase_flag() {
    let dir = tempdir().unwrap();
    let output = provision(&[]).current_dir(dir.path()).output().unwrap();

    assert!(!output.status.success());
}
