use std::path::Path;
use std::process::{Command, Output};

use image::{Rgb, RgbImage};
use serde_json::Value;

fn dragoneye(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dragoneye"))
        .args(args)
        .arg("--quiet")
        .output()
        .expect("Failed to run dragoneye")
}

fn stdout_json(output: &Output) -> Value {
    assert!(output.status.success(), "exit status {:?}", output.status);
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn write_specimen(path: &Path) {
    RgbImage::from_fn(400, 300, |x, y| {
        if (60..340).contains(&x) && (80..220).contains(&y) {
            Rgb([200, 30, 30])
        } else {
            Rgb([255, 255, 255])
        }
    })
    .save(path)
    .expect("Failed to write photograph");
}

#[test]
fn test_calibration_prints_defaults() {
    let output = dragoneye(&["calibration", "--format", "json"]);
    let profile = stdout_json(&output);
    assert_eq!(profile["pixel_per_cm"], 102.0);
    assert_eq!(profile["density_g_per_cm3"], 0.22);
    assert_eq!(profile["weight_model"]["kind"], "cylinder");
}

#[test]
fn test_fuzzy_reports_firing_strengths() {
    let output = dragoneye(&[
        "fuzzy", "--length", "1", "--diameter", "1", "--weight", "1", "--ratio", "1",
    ]);
    let report = stdout_json(&output);

    let score = report["score"].as_f64().expect("score is a number");
    assert!((score - 88.666_667).abs() < 1e-3);
    assert_eq!(report["grade"], "A");
    assert_eq!(report["degenerate"], false);

    let rules = report["rules"].as_array().expect("rules is an array");
    assert_eq!(rules.len(), 9);
    assert_eq!(rules[0]["strength"], 1.0);
    assert_eq!(rules[5]["rule"], "IF weight IS low THEN low");
}

#[test]
fn test_grade_photograph() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let photo = dir.path().join("fruit.png");
    write_specimen(&photo);
    let photo = photo.to_str().expect("utf-8 path");

    let result = stdout_json(&dragoneye(&["grade", photo]));
    assert_eq!(result["diagnostics"]["specimen_found"], true);
    assert_eq!(result["basis"], "fuzzy_score");

    let weighed = stdout_json(&dragoneye(&["grade", photo, "--actual-weight", "375"]));
    assert_eq!(weighed["final_grade"], "A");
    assert_eq!(weighed["basis"], "actual_weight");
}

#[test]
fn test_grade_with_calibration_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let photo = dir.path().join("fruit.png");
    write_specimen(&photo);

    let profile = dir.path().join("profile.toml");
    std::fs::write(&profile, "pixel_per_cm = 20.0\n").expect("write");

    let coarse = stdout_json(&dragoneye(&[
        "grade",
        photo.to_str().expect("utf-8 path"),
        "--calibration",
        profile.to_str().expect("utf-8 path"),
    ]));
    let fine = stdout_json(&dragoneye(&["grade", photo.to_str().expect("utf-8 path")]));

    let coarse_length = coarse["length_cm"].as_f64().expect("number");
    let fine_length = fine["length_cm"].as_f64().expect("number");
    assert!((coarse_length / fine_length - 102.0 / 20.0).abs() < 1e-6);
}

#[test]
fn test_survey_then_grade() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let photos = dir.path().join("photos");
    std::fs::create_dir(&photos).expect("mkdir");
    for name in ["a.png", "b.png"] {
        write_specimen(&photos.join(name));
    }
    let population = dir.path().join("population.json");

    let output = dragoneye(&[
        "survey",
        photos.to_str().expect("utf-8 path"),
        "--output",
        population.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success());

    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(&population).expect("read")).expect("JSON");
    assert_eq!(saved["weight_est_g"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_missing_photograph_exit_code() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("missing.png");
    let output = dragoneye(&["grade", missing.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_invalid_calibration_exit_code() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let photo = dir.path().join("fruit.png");
    write_specimen(&photo);
    let output = dragoneye(&[
        "grade",
        photo.to_str().expect("utf-8 path"),
        "--pixel-per-cm",
        "0",
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_survey_writes_metrics() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let photos = dir.path().join("photos");
    std::fs::create_dir(&photos).expect("mkdir");
    for name in ["a.png", "b.png"] {
        write_specimen(&photos.join(name));
    }
    let weights = dir.path().join("weights.json");
    std::fs::write(&weights, r#"{"a.png": 120.0, "b.png": 410.0}"#).expect("write");
    let population = dir.path().join("population.json");
    let metrics = dir.path().join("metrics.json");

    let output = dragoneye(&[
        "survey",
        photos.to_str().expect("utf-8 path"),
        "--output",
        population.to_str().expect("utf-8 path"),
        "--weights",
        weights.to_str().expect("utf-8 path"),
        "--metrics",
        metrics.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success());

    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(&metrics).expect("read")).expect("JSON");
    assert_eq!(saved["samples"], 2);
    assert!(saved["accuracy"].is_number());
    assert_eq!(saved["classes"].as_array().map(Vec::len), Some(3));
}

#[test]
fn test_metrics_need_weights() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let output = dragoneye(&[
        "survey",
        dir.path().to_str().expect("utf-8 path"),
        "--output",
        dir.path().join("population.json").to_str().expect("utf-8 path"),
        "--metrics",
        dir.path().join("metrics.json").to_str().expect("utf-8 path"),
    ]);
    assert!(!output.status.success());
}
