use std::process::Command;
use tempfile::tempdir;

fn beammon() -> Command {
    Command::new(env!("CARGO_BIN_EXE_beammon"))
}

#[test]
fn test_layout_template() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layout.json");
    let status = beammon()
        .args(["layout", "--output"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(status.success());

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["calibration"]["sample_size"], 5000);
    assert_eq!(value["layout"]["t0"]["channels"][3], 3);
    assert_eq!(value["pid_method"], "box");
}

#[test]
fn test_check_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("runs.json");
    std::fs::write(
        &path,
        r#"{ "1610": { "dataquality": { "GoodRun": true },
                       "box": { "muon": { "tof_min": 15.0, "tof_max": 16.0, "act_min": 0.0, "act_max": 2000.0 } } } }"#,
    )
    .unwrap();

    let output = beammon()
        .args(["check-run", "--run", "1610", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Run 1610: good"));
    assert!(stdout.contains("electron  no box"));

    let output = beammon()
        .args(["check-run", "--run", "7", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&output.stdout).contains("Run 7: bad"));
}

#[test]
fn test_unreadable_config_fails() {
    let output = beammon()
        .args(["check-run", "--run", "1", "--config", "/nonexistent/runs.json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("run 1 aborted at config load"), "{stderr}");
}

#[test]
fn test_process_config_failure_names_run() {
    let dir = tempdir().unwrap();
    let events = dir.path().join("events.jsonl");
    std::fs::write(&events, "{\"run_id\": 2001, \"hits\": []}\n").unwrap();

    let output = beammon()
        .args(["process", "--config", "/nonexistent/runs.json", "--events"])
        .arg(&events)
        .arg("--output")
        .arg(dir.path().join("results.csv"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("run 2001 aborted at config load"), "{stderr}");
    assert!(!dir.path().join("results.csv").exists());
}
