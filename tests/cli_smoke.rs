use std::path::PathBuf;
use std::process::Command;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_sceneplan")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "sceneplan.exe"
            } else {
                "sceneplan"
            });
            p
        })
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

#[test]
fn cli_validate_prints_plan_and_diagnostics() {
    let out = Command::new(exe())
        .args(["validate", "--in"])
        .arg(fixture("projectile_plan.json"))
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["diagnostics"]["success"], true);
    assert_eq!(report["diagnostics"]["confidence"], "low");
    assert_eq!(report["plan"]["scenes"][0]["objects"][2]["type"], "Dot");
}

#[test]
fn cli_validate_fails_on_rejected_plan() {
    let out = Command::new(exe())
        .args(["validate", "--in"])
        .arg(fixture("missing_scenes.json"))
        .output()
        .unwrap();
    assert!(!out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["diagnostics"]["success"], false);
}

#[test]
fn cli_script_writes_python_file() {
    let dir = PathBuf::from("target").join("cli_script");
    let _ = std::fs::remove_dir_all(&dir);

    let out = Command::new(exe())
        .args(["script", "--in"])
        .arg(fixture("clean_plan.json"))
        .arg("--out-dir")
        .arg(&dir)
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let path = PathBuf::from(String::from_utf8_lossy(&out.stdout).trim());
    assert_eq!(path, dir.join("orbit.py"));
    let code = std::fs::read_to_string(path).unwrap();
    assert!(code.contains("class Orbit(Scene):"));
    assert!(code.contains("obj_sun = Circle(radius=1.0)"));
    assert!(code.contains("self.play(FadeIn(obj_earth), run_time=1.5)"));
}

#[test]
fn cli_plan_against_unreachable_endpoint_prints_empty_plan() {
    let dir = PathBuf::from("target").join("cli_plan_unreachable");
    let _ = std::fs::remove_dir_all(&dir);
    let key = "SUPER-SECRET-KEY-123";

    let out = Command::new(exe())
        .args(["plan", "--attempts", "2", "--out-dir"])
        .arg(&dir)
        .arg("launch a ball")
        .env("GEMINI_API_KEY", key)
        .env("GEMINI_ENDPOINT", "http://127.0.0.1:1")
        .output()
        .unwrap();
    assert!(!out.status.success());
    let printed: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(printed, serde_json::json!({}));
    assert!(!String::from_utf8_lossy(&out.stderr).contains(key));

    let log = std::fs::read_to_string(dir.join("enhancer_log.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(!log.contains(key));
}

#[test]
fn cli_plan_without_key_still_logs() {
    let dir = PathBuf::from("target").join("cli_plan_no_key");
    let _ = std::fs::remove_dir_all(&dir);

    let out = Command::new(exe())
        .args(["plan", "--out-dir"])
        .arg(&dir)
        .arg("launch a ball")
        .env_remove("GEMINI_API_KEY")
        .output()
        .unwrap();
    assert!(!out.status.success());
    let printed: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(printed, serde_json::json!({}));

    let log = std::fs::read_to_string(dir.join("enhancer_log.jsonl")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1);
    let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert!(entry["error"].as_str().unwrap().contains("GEMINI_API_KEY"));
}
