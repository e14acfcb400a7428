use std::io::Write;
use std::process::Command;

fn blockstep() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_blockstep"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn program_file(json: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("temp file");
    f.write_all(json.as_bytes()).expect("write program");
    f
}

fn stdout_json(out: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&out.stdout).expect("stdout is JSON")
}

const SQUARE: &str = r#"[
    {"type":"loopStart","label":"A","iterations":4},
    {"type":"command","name":"forward2"},
    {"type":"command","name":"right90"},
    {"type":"loopEnd","label":"A"}
]"#;

// --- run: success ---

#[test]
fn run_square_returns_to_start() {
    let program = program_file(SQUARE);
    let out = blockstep()
        .args(["run"])
        .arg(program.path())
        .output()
        .expect("failed to run blockstep");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v = stdout_json(&out);
    assert_eq!(v["state"], "stopped");
    assert_eq!(v["programCounter"], 4);
    assert_eq!(v["pose"]["x"], 1);
    assert_eq!(v["pose"]["y"], 1);
    assert_eq!(v["pose"]["heading"], 2);
    assert_eq!(v["cell"], "A1");
    assert_eq!(v["path"].as_array().unwrap().len(), 4);
}

#[test]
fn run_forward_left_forward() {
    let program = program_file(
        r#"[{"type":"command","name":"forward1"},
            {"type":"command","name":"left90"},
            {"type":"command","name":"forward1"}]"#,
    );
    let out = blockstep()
        .args(["run", "--width", "10", "--height", "10"])
        .arg(program.path())
        .output()
        .expect("failed to run blockstep");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v = stdout_json(&out);
    // Heading north from the top row clamps: only the first move draws.
    assert_eq!(v["pose"]["x"], 2);
    assert_eq!(v["pose"]["y"], 1);
    assert_eq!(v["pose"]["heading"], 0);
    assert_eq!(v["path"], serde_json::json!([{"x1":1,"y1":1,"x2":2,"y2":1}]));
}

#[test]
fn run_no_draw_leaves_empty_path() {
    let program = program_file(r#"[{"type":"command","name":"forward3"}]"#);
    let out = blockstep()
        .args(["run", "--no-draw"])
        .arg(program.path())
        .output()
        .expect("failed to run blockstep");
    assert!(out.status.success());
    let v = stdout_json(&out);
    assert_eq!(v["pose"]["x"], 4);
    assert!(v["path"].as_array().unwrap().is_empty());
}

#[test]
fn run_text_output() {
    let program = program_file(r#"[{"type":"command","name":"forward2"}]"#);
    let out = blockstep()
        .args(["run", "--text"])
        .arg(program.path())
        .output()
        .expect("failed to run blockstep");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("stopped: C1 (3, 1) heading 90°"), "got: {stdout}");
    assert!(stdout.contains("(1, 1) -> (3, 1)"), "got: {stdout}");
}

#[test]
fn run_with_config_file_and_override() {
    let program = program_file(r#"[{"type":"command","name":"forward3"}]"#);
    let config = program_file(r#"{"width": 3, "height": 12, "start": {"x": 1, "y": 6, "heading": 2}}"#);
    let out = blockstep()
        .args(["run", "--height", "5", "--config"])
        .arg(config.path())
        .arg(program.path())
        .output()
        .expect("failed to run blockstep");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v = stdout_json(&out);
    // Width 3 pins x; height override clamps the start row to 5.
    assert_eq!(v["pose"]["x"], 3);
    assert_eq!(v["pose"]["y"], 5);
}

#[test]
fn empty_program_completes() {
    let program = program_file("[]");
    let out = blockstep().arg("run").arg(program.path()).output().expect("failed to run blockstep");
    assert!(out.status.success());
    assert_eq!(stdout_json(&out)["programCounter"], 0);
}

// --- run: failures ---

#[test]
fn unknown_command_reports_diagnostic() {
    let program = program_file(
        r#"[{"type":"command","name":"forward1"},
            {"type":"command","name":"jump"}]"#,
    );
    let out = blockstep().arg("run").arg(program.path()).output().expect("failed to run blockstep");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error[BS-R001]: unknown command: jump"), "stderr: {stderr}");
    assert!(stderr.contains("--> block 1"), "stderr: {stderr}");
    assert!(out.stdout.is_empty());
}

#[test]
fn unknown_command_json_diagnostic() {
    let program = program_file(r#"[{"type":"command","name":"jump"}]"#);
    let out = blockstep()
        .args(["run", "--json"])
        .arg(program.path())
        .output()
        .expect("failed to run blockstep");
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stderr).expect("stderr is JSON");
    assert_eq!(v["code"], "BS-R001");
    assert_eq!(v["labels"][0]["block"], 0);
    assert_eq!(v["labels"][0]["text"], "jump");
}

#[test]
fn unclosed_loop_is_rejected() {
    let program = program_file(r#"[{"type":"loopStart","label":"A","iterations":2}]"#);
    let out = blockstep()
        .args(["run", "--json"])
        .arg(program.path())
        .output()
        .expect("failed to run blockstep");
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stderr).expect("stderr is JSON");
    assert_eq!(v["code"], "BS-P002");
}

#[test]
fn missing_program_file() {
    let out = blockstep()
        .args(["run", "--json", "/nonexistent/program.json"])
        .output()
        .expect("failed to run blockstep");
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stderr).expect("stderr is JSON");
    assert_eq!(v["code"], "BS-C001");
}

#[test]
fn zero_width_is_rejected() {
    let program = program_file("[]");
    let out = blockstep()
        .args(["run", "--width", "0"])
        .arg(program.path())
        .output()
        .expect("failed to run blockstep");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("BS-C003"));
}

// --- explain ---

#[test]
fn explain_known_code() {
    let out = blockstep().args(["explain", "bs-p003"]).output().expect("failed to run blockstep");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("## BS-P003: overlapping loops"), "got: {stdout}");
}

#[test]
fn explain_unknown_code() {
    let out = blockstep().args(["explain", "BS-X999"]).output().expect("failed to run blockstep");
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown error code"));
}
