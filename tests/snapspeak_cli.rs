use std::process::Command;

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn snapspeak_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_snapspeak").expect("snapspeak test binary not built")
}

#[test]
fn help_mentions_name() {
    let output = Command::new(snapspeak_bin())
        .arg("--help")
        .output()
        .expect("run snapspeak --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("SnapSpeak"));
}

#[test]
fn list_cameras_prints_detected_devices() {
    let output = Command::new(snapspeak_bin())
        .arg("--list-cameras")
        .output()
        .expect("run snapspeak --list-cameras");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("Detected cameras") || combined.contains("No cameras detected"));
}

#[test]
fn rejects_invalid_joke_cooldown() {
    let output = Command::new(snapspeak_bin())
        .args(["--joke-cooldown-ms", "1"])
        .output()
        .expect("run snapspeak with bad cooldown");
    assert!(!output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("--joke-cooldown-ms"));
}
