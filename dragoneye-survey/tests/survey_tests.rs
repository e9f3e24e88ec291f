use std::path::Path;

use dragoneye::{Grade, Grader, NormalizationSource, ReferencePopulation};
use dragoneye_survey::*;
use image::{Rgb, RgbImage};

fn write_specimen(path: &Path, width: u32, height: u32) {
    let image = RgbImage::from_fn(320, 240, |x, y| {
        if (40..40 + width).contains(&x) && (40..40 + height).contains(&y) {
            Rgb([200, 30, 30])
        } else {
            Rgb([255, 255, 255])
        }
    });
    image.save(path).expect("Failed to write photograph");
}

fn write_blank(path: &Path) {
    RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]))
        .save(path)
        .expect("Failed to write photograph");
}

#[test]
fn test_image_extensions() {
    assert!(is_image_file(Path::new("a.png")));
    assert!(is_image_file(Path::new("a.JPG")));
    assert!(is_image_file(Path::new("dir/a.jpeg")));
    assert!(is_image_file(Path::new("a.bmp")));
    assert!(!is_image_file(Path::new("a.txt")));
    assert!(!is_image_file(Path::new("png")));
}

#[test]
fn test_list_images_sorted_and_flat() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_blank(&dir.path().join("b.png"));
    write_blank(&dir.path().join("a.png"));
    std::fs::write(dir.path().join("notes.txt"), "not a photo").expect("write");
    std::fs::create_dir(dir.path().join("nested")).expect("mkdir");
    write_blank(&dir.path().join("nested").join("c.png"));

    let images = list_images(dir.path()).expect("Failed to list images");
    let names: Vec<_> = images
        .iter()
        .map(|p| p.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["a.png", "b.png"]);
}

#[test]
fn test_survey_directory() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_specimen(&dir.path().join("01.png"), 200, 100);
    write_specimen(&dir.path().join("02.png"), 240, 120);
    write_specimen(&dir.path().join("03.bmp"), 160, 90);
    write_blank(&dir.path().join("04.png"));
    std::fs::write(dir.path().join("05.png"), b"truncated").expect("write");

    let report = survey_directory(dir.path(), &Grader::default()).expect("Failed to survey");

    assert_eq!(report.total(), 5);
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].file.ends_with("05.png"));
    assert!(report.skipped[0].ends_with("04.png"));

    assert_eq!(report.population.len(), 3);
    let heaviest = report
        .records
        .iter()
        .map(|r| r.features.geometry.weight_est_g)
        .fold(0.0, f64::max);
    assert_eq!(heaviest, report.records[1].features.geometry.weight_est_g);
}

#[test]
fn test_survey_population_drives_normalization() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (i, width) in [150, 180, 210, 240].into_iter().enumerate() {
        write_specimen(&dir.path().join(format!("{i:02}.png")), width, width / 2);
    }

    let grader = Grader::default();
    let report = survey_directory(dir.path(), &grader).expect("Failed to survey");

    let path = dir.path().join("population.yaml");
    report.population.save(&path).expect("Failed to save population");
    let population = ReferencePopulation::load(&path).expect("Failed to load population");
    assert_eq!(population, report.population);

    let photo = image::open(dir.path().join("01.png")).expect("Failed to open photograph");
    let result = grader
        .grade_image(&photo, Some(&population), None)
        .expect("Failed to grade");
    assert_eq!(
        result.diagnostics.normalization.weight.source,
        NormalizationSource::Percentile
    );
}

#[test]
fn test_survey_report_round_trip() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_specimen(&dir.path().join("a.png"), 200, 100);
    write_blank(&dir.path().join("b.png"));

    let report = survey_directory(dir.path(), &Grader::default()).expect("Failed to survey");
    let path = dir.path().join("report.yaml");
    report.save(&path).expect("Failed to save report");

    let loaded: SurveyReport = dragoneye::config::load(&path).expect("Failed to load report");
    assert_eq!(loaded, report);
}

#[test]
fn test_survey_errors() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let err = survey_directory(dir.path(), &Grader::default()).unwrap_err();
    assert!(matches!(err, SurveyError::NoImages(_)));
    assert!(err.is_input_error());

    let missing = dir.path().join("missing");
    let err = survey_directory(&missing, &Grader::default()).unwrap_err();
    assert!(matches!(err, SurveyError::NotADirectory(_)));
}

#[test]
fn test_survey_with_weights() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let photos = dir.path().join("photos");
    std::fs::create_dir(&photos).expect("mkdir");
    write_specimen(&photos.join("01.png"), 200, 100);
    write_specimen(&photos.join("02.png"), 240, 120);
    write_specimen(&photos.join("03.png"), 160, 90);

    let weights_path = dir.path().join("weights.toml");
    std::fs::write(
        &weights_path,
        "\"01.png\" = 400.0\n\"02.png\" = 200.0\n\"missing.png\" = 300.0\n",
    )
    .expect("write");
    let weights = load_actual_weights(&weights_path).expect("Failed to load weights");
    assert_eq!(weights.len(), 3);

    let report = survey_with_weights(&photos, &Grader::default(), &weights).expect("Failed to survey");

    // small specimens grade C from vision alone
    assert!(report.records.iter().all(|r| r.grade == Grade::C));
    assert_eq!(report.records[0].actual_weight_g, Some(400.0));
    assert_eq!(report.records[2].actual_weight_g, None);

    let metrics = report.metrics.as_ref().expect("metrics computed");
    assert_eq!(metrics.samples, 2);
    assert_eq!(metrics.accuracy, 0.5);
    assert_eq!(metrics.confusion[0][2], 1);
    assert_eq!(metrics.confusion[2][2], 1);
    assert!(metrics.weight_bias_g < 0.0);
    assert!(metrics.weight_mae_g > 250.0);

    let path = dir.path().join("report.yaml");
    report.save(&path).expect("Failed to save report");
    let loaded: SurveyReport = dragoneye::config::load(&path).expect("Failed to load report");
    assert_eq!(loaded, report);
}

#[test]
fn test_survey_without_weights_has_no_metrics() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_specimen(&dir.path().join("a.png"), 200, 100);

    let report = survey_directory(dir.path(), &Grader::default()).expect("Failed to survey");
    assert!(report.metrics.is_none());
    assert!(report.records[0].graded_sample().is_none());
}
