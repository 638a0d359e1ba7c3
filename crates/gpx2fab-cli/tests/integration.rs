//! Integration tests for gpx2fab CLI commands.
//!
//! These tests run the actual binary against the fixtures in `test_assets/`.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

fn binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gpx2fab"))
}

/// Path of a file under the repository's `test_assets/`.
fn asset(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // Go up from gpx2fab-cli to crates
    path.pop(); // Go up from crates to repo root
    path.push("test_assets");
    path.push(name);
    path
}

/// Fresh, empty output directory for one test.
fn out_dir(test: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(test);
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn run(args: &[&str]) -> Output {
    Command::new(binary_path())
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn path_str(path: &PathBuf) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn config_command_prints_defaults() {
    let output = run(&["config"]);
    assert!(output.status.success(), "config should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("region: Hungary"), "Should print the default region");
    assert!(stdout.contains("hatch_spacing_mm: 0.5"), "Should print fabrication defaults");
    assert!(stdout.contains("edge: long"), "Should print the stitch edge");
}

#[test]
fn generate_writes_both_drawings() {
    let dir = out_dir("generate_writes_both_drawings");
    let (track, data, config) = (asset("track.gpx"), asset("data"), asset("config.yaml"));
    let output = run(&[
        "generate",
        path_str(&track),
        "--data",
        path_str(&data),
        "--config",
        path_str(&config),
        "--out-dir",
        path_str(&dir),
        "-q",
    ]);
    assert!(output.status.success(), "generate failed: {}", String::from_utf8_lossy(&output.stderr));

    let plotter = fs::read_to_string(dir.join("track_plotter.svg")).expect("plotter drawing");
    for label in ["1-borders", "2-water", "3-trail"] {
        assert!(plotter.contains(&format!(r#"inkscape:label="{label}""#)), "plotter misses {label}");
    }
    assert!(!plotter.contains("4-text"), "no caption, no text layer");

    let laser = fs::read_to_string(dir.join("track_laser.svg")).expect("laser drawing");
    for label in ["1-Trail", "2-Contour", "3-Stitch", "4-Engrave"] {
        assert!(laser.contains(&format!(r#"inkscape:label="{label}""#)), "laser misses {label}");
    }
    assert!(laser.contains(r#"width="210.0000mm""#));
    assert!(!dir.join("track_preview.png").exists(), "preview only on request");
}

#[test]
fn generate_with_name_and_preview() {
    let dir = out_dir("generate_with_name_and_preview");
    let (track, data, config) = (asset("track.gpx"), asset("data"), asset("config.yaml"));
    let output = run(&[
        "generate",
        path_str(&track),
        "-d",
        path_str(&data),
        "-c",
        path_str(&config),
        "-o",
        path_str(&dir),
        "--name",
        "cover",
        "--preview",
    ]);
    assert!(output.status.success(), "generate failed: {}", String::from_utf8_lossy(&output.stderr));

    assert!(dir.join("cover_plotter.svg").exists());
    assert!(dir.join("cover_laser.svg").exists());
    let png = fs::read(dir.join("cover_preview.png")).expect("preview");
    assert_eq!(&png[1..4], b"PNG", "preview should be a PNG");
}

#[test]
fn layers_command_prints_json() {
    let (track, data, config) = (asset("track.gpx"), asset("data"), asset("config.yaml"));
    let output = run(&[
        "layers",
        path_str(&track),
        "--data",
        path_str(&data),
        "--config",
        path_str(&config),
        "--json",
        "-q",
    ]);
    assert!(output.status.success(), "layers failed: {}", String::from_utf8_lossy(&output.stderr));

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let rows = rows.as_array().expect("array of layers");
    assert_eq!(rows.len(), 7, "3 plotter + 4 laser layers");
    assert_eq!(rows[0]["device"], "plotter");
    assert_eq!(rows[0]["name"], "borders");
    assert!(rows[0]["paths"].as_u64().unwrap_or(0) > 0, "borders should have paths");
    assert_eq!(rows[6]["name"], "Engrave");
}

#[test]
fn unknown_region_fails_without_output() {
    let dir = out_dir("unknown_region_fails_without_output");
    let (track, data, config) = (asset("track.gpx"), asset("data"), asset("config.yaml"));
    let output = run(&[
        "generate",
        path_str(&track),
        "--data",
        path_str(&data),
        "--config",
        path_str(&config),
        "--region",
        "Atlantis",
        "--out-dir",
        path_str(&dir),
    ]);
    assert!(!output.status.success(), "unknown region should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Atlantis"), "error should name the region: {stderr}");
    assert!(!dir.exists(), "nothing should be written");
}

#[test]
fn short_track_is_rejected() {
    let dir = out_dir("short_track_is_rejected");
    let (track, data) = (asset("empty.gpx"), asset("data"));
    let output = run(&["generate", path_str(&track), "--data", path_str(&data), "--out-dir", path_str(&dir)]);
    assert!(!output.status.success(), "a one-point track should fail");
    assert!(String::from_utf8_lossy(&output.stderr).contains("track"));
    assert!(!dir.exists());
}

#[test]
fn missing_dataset_is_fatal() {
    let dir = out_dir("missing_dataset_is_fatal");
    let (track, data) = (asset("track.gpx"), asset("data"));
    // Default config names Natural Earth datasets that are not in the fixtures
    let output = run(&[
        "generate",
        path_str(&track),
        "--data",
        path_str(&data),
        "--region",
        "Testland",
        "--out-dir",
        path_str(&dir),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ne_10m"));
    assert!(!dir.exists());
}

#[test]
fn help_command_shows_usage() {
    let output = run(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("generate"), "Help should list generate");
    assert!(stdout.contains("layers"), "Help should list layers");
    assert!(stdout.contains("config"), "Help should list config");
}
