use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tempfile::tempdir;

fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(relative)
}

fn ssot() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ssot"));
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn healthy_manifest_audits_cleanly() {
    let out = tempdir().unwrap();
    let status = ssot()
        .arg("audit")
        .arg("--manifest")
        .arg(fixture("modules/fine_structure.yaml"))
        .arg("--references")
        .arg(fixture("references.yaml"))
        .arg("--policy")
        .arg(fixture("policy.yaml"))
        .arg("--out")
        .arg(out.path())
        .status()
        .unwrap();
    assert!(status.success());

    let report = out.path().join("fine_structure.report.json");
    assert!(report.exists());
    let summary: serde_json::Value =
        serde_json::from_slice(&fs::read(out.path().join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["needs_review"], 0);
    assert_eq!(summary["modules"][0]["verdict"], "all_green");

    let verified = ssot().arg("verify").arg("--report").arg(&report).output().unwrap();
    assert!(verified.status.success());
    assert!(String::from_utf8_lossy(&verified.stdout).starts_with("fine_structure "));
}

#[test]
fn contradictions_exit_with_failure() {
    let out = tempdir().unwrap();
    let status = ssot()
        .args(["audit", "--jobs", "2", "--manifest"])
        .arg(fixture("modules/fine_structure.yaml"))
        .arg("--manifest")
        .arg(fixture("modules/e8_roots.yaml"))
        .arg("--manifest")
        .arg(fixture("modules/malformed.yaml"))
        .arg("--references")
        .arg(fixture("references.yaml"))
        .arg("--out")
        .arg(out.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));

    let summary: serde_json::Value =
        serde_json::from_slice(&fs::read(out.path().join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["needs_review"], 2);
    assert_eq!(summary["modules"][1]["module_id"], "e8_roots");
    assert_eq!(summary["modules"][1]["verdict"], "needs_review");
    assert_eq!(summary["modules"][2]["outcome"], "failed");
    assert_eq!(summary["modules"][2]["code"], "registry.duplicate");
    assert!(!out.path().join("malformed.report.json").exists());

    let printed = ssot()
        .args(["status", "--issues", "--report"])
        .arg(out.path().join("e8_roots.report.json"))
        .output()
        .unwrap();
    assert!(printed.status.success());
    let stdout = String::from_utf8_lossy(&printed.stdout);
    assert!(stdout.contains("\"verdict\": \"needs_review\""));
    assert!(stdout.contains("ArithmeticError"));
}

#[test]
fn tampered_report_fails_verification() {
    let out = tempdir().unwrap();
    let status = ssot()
        .arg("audit")
        .arg("--manifest")
        .arg(fixture("modules/fine_structure.yaml"))
        .arg("--references")
        .arg(fixture("references.yaml"))
        .arg("--out")
        .arg(out.path())
        .status()
        .unwrap();
    assert!(status.success());

    let path = out.path().join("fine_structure.report.json");
    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replace("\"fine_structure\"", "\"renamed\"")).unwrap();
    let verified = ssot().arg("verify").arg("--report").arg(&path).output().unwrap();
    assert!(!verified.status.success());
}

#[test]
fn module_ids_cannot_write_outside_the_output_directory() {
    let root = tempdir().unwrap();
    let manifest = root.path().join("escape.yaml");
    fs::write(&manifest, "module_id: ../escaped\n").unwrap();
    let out = root.path().join("inner");

    let status = ssot()
        .arg("audit")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--references")
        .arg(fixture("references.yaml"))
        .arg("--out")
        .arg(&out)
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(!root.path().join("escaped.report.json").exists());
}
