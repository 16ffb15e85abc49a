#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn biliopen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_biliopen"))
        .args(["--log-level", "error"])
        .args(args)
        .env_remove("LIVE_CODE")
        .env_remove("LIVE_APP_KEY")
        .env_remove("LIVE_APP_SECRET")
        .env_remove("LIVE_PROJECT_ID")
        .env_remove("BILIOPEN_API_HOST")
        .output()
        .expect("biliopen should run")
}

#[test]
fn version_prints_package_version() {
    let output = biliopen(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("biliopen {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn decode_prints_frame_as_json() {
    // AUTH_ACK, sequence 1, body {"code":0}
    let output = biliopen(&[
        "--format",
        "json",
        "decode",
        "0000001a 0010 0000 00000008 00000001 7b22636f6465223a307d",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("decode output should be json");
    assert_eq!(value["operation"], 8);
    assert_eq!(value["operation_name"], "AUTH_ACK");
    assert_eq!(value["sequence"], 1);
    assert_eq!(value["body"], r#"{"code":0}"#);
}

#[test]
fn decode_prints_danmaku_event() {
    let body = r#"{"cmd":"LIVE_OPEN_PLATFORM_DM","data":{"uid":123,"uname":"alice","msg":"hello"}}"#;
    let mut frame = Vec::new();
    frame.extend_from_slice(&(16 + body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&[0, 16, 0, 0, 0, 0, 0, 5, 0, 0, 0, 2]);
    frame.extend_from_slice(body.as_bytes());
    let hex: String = frame.iter().map(|b| format!("{b:02x}")).collect();

    let output = biliopen(&["--format", "json", "decode", &hex]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let event = stdout.lines().nth(1).expect("event line after frame line");
    let value: serde_json::Value = serde_json::from_str(event).expect("event should be json");
    assert_eq!(value["type"], "danmaku");
    assert_eq!(value["uname"], "alice");
    assert_eq!(value["uid"], 123);
}

#[test]
fn decode_malformed_frame_returns_60() {
    // Header length 20 instead of 16.
    let output = biliopen(&["decode", "00000012 0014 0000 00000005 00000000 7b7d"]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("decode failed"));
}

#[test]
fn decode_invalid_hex_returns_64() {
    let output = biliopen(&["decode", "zz"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn listen_without_credentials_is_usage_error() {
    let output = biliopen(&["listen", "--code", "ABC"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn listen_unreachable_api_returns_3() {
    let output = biliopen(&[
        "listen",
        "--code",
        "ABC",
        "--app-key",
        "key",
        "--app-secret",
        "secret",
        "--project-id",
        "1",
        "--api-host",
        "http://127.0.0.1:1",
    ]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));
}
