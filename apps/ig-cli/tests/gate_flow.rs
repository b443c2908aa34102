// gate_flow.rs - Drives the impulse-guard binary end to end.
//
// Each test writes its own config pointing stats at a temp directory, runs
// the terminal gate with piped stdin, and reads the stats back through the
// CLI.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

const SCENARIO_ONE: &str =
    "I already replaced my broken laptop charger and compared prices, staying within budget";

fn binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_impulse-guard"));
    cmd.env_remove("CEREBRAS_API_KEY").env("RUST_LOG", "warn");
    cmd
}

/// Config file with stats under `dir/data` plus any extra TOML.
fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let data = dir.join("data");
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!(
            "[stats]\ndata_dir = {:?}\n\n[evaluator.model]\nenabled = false\n\n{}",
            data.display().to_string(),
            extra
        ),
    )
    .unwrap();
    path
}

fn run(config: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = binary()
        .arg("--config")
        .arg(config)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn snapshot(config: &Path) -> serde_json::Value {
    let output = run(config, &["stats", "show", "--json"], "");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn giving_up_blocks_and_counts_a_victory() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    let output = run(
        &config,
        &[
            "gate",
            "--no-model",
            "--product",
            "Wireless Gaming Mouse",
            "--price",
            "$79.99",
            "--url",
            "https://shop.example.com/checkout",
        ],
        "asdfasdfasdf\n/giveup\n",
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let out = stdout(&output);
    assert!(out.contains("Wireless Gaming Mouse"));
    assert!(out.contains("Guardian:"));
    assert!(out.contains("BLOCKED"));
    assert!(out.contains("Checkout stays blocked on shop.example.com."));

    let snapshot = snapshot(&config);
    assert_eq!(snapshot["totalBattles"], 1);
    assert_eq!(snapshot["victories"], 1);
    assert_eq!(snapshot["defeats"], 0);
    assert!((snapshot["moneySaved"].as_f64().unwrap() - 79.99).abs() < 1e-9);
}

#[test]
fn persuasive_argument_allows_the_purchase() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[gate]\npass_threshold = 40\n");

    let output = run(
        &config,
        &[
            "gate",
            "--no-model",
            "--product",
            "USB-C Laptop Charger 100W",
            "--price",
            "$59.99",
            "--url",
            "https://shop.example.com/checkout",
        ],
        &format!("{}\n", SCENARIO_ONE),
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let out = stdout(&output);
    assert!(out.contains("ALLOWED"));
    assert!(out.contains("Checkout unlocked for shop.example.com."));

    let snapshot = snapshot(&config);
    assert_eq!(snapshot["totalBattles"], 1);
    assert_eq!(snapshot["defeats"], 1);

    let history = run(&config, &["stats", "history", "-n", "5"], "");
    assert!(stdout(&history).contains("USB-C Laptop Charger 100W"));
}

#[test]
fn closing_stdin_abandons_the_session() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[gate]\nmode = \"health\"\n");

    let output = run(&config, &["gate", "--no-model"], "");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("abandoned"));

    let report = run(&config, &["stats", "report", "--json"], "");
    let report: serde_json::Value = serde_json::from_slice(&report.stdout).unwrap();
    assert_eq!(report["totals"]["attempts"], 1);
    assert_eq!(report["totals"]["blocked"], 1);
    assert_eq!(report["history"][0]["resolution"], "abandoned");
    assert_eq!(report["history"][0]["mode"], "health");
}

#[test]
fn reset_needs_confirmation() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    run(&config, &["gate", "--no-model"], "/giveup\n");

    let refused = run(&config, &["stats", "reset"], "");
    assert!(!refused.status.success());
    assert_eq!(snapshot(&config)["totalBattles"], 1);

    let reset = run(&config, &["stats", "reset", "--yes"], "");
    assert!(stdout(&reset).contains("Stats reset."));
    assert_eq!(snapshot(&config)["totalBattles"], 0);
}

#[test]
fn check_reports_checkout_pages() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[trigger]\nignore_domains = [\"*.mybank.example\"]\n");

    let gated = run(&config, &["check", "https://shop.example.com/cart"], "");
    assert!(stdout(&gated).starts_with("GATE"));

    let plain = run(&config, &["check", "https://shop.example.com/blog/post"], "");
    assert!(stdout(&plain).starts_with("PASS"));

    let ignored = run(&config, &["check", "https://pay.mybank.example/payment"], "");
    assert!(stdout(&ignored).starts_with("PASS"));
}

#[test]
fn config_show_masks_inline_keys() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[evaluator.model]\napi_key = \"csk-very-secret\"\n").unwrap();

    let output = run(&config, &["config", "show"], "");
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(!out.contains("csk-very-secret"));
    assert!(out.contains("[gate]"));
}

#[test]
fn missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir.path().join("absent.toml"), &["stats", "show"], "");
    assert!(!output.status.success());
}
