use dragoneye::{Grade, GradingPolicy};
use dragoneye_survey::evaluation::GRADES;
use dragoneye_survey::*;

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} +/- {tolerance}, got {actual}"
    );
}

fn sample(predicted: Grade, weight_est_g: f64, actual_weight_g: f64) -> GradedSample {
    GradedSample {
        predicted,
        weight_est_g,
        actual_weight_g,
    }
}

#[test]
fn test_evaluate_confusion_and_scores() {
    let samples = [
        sample(Grade::A, 380.0, 400.0),
        sample(Grade::B, 310.0, 300.0),
        sample(Grade::B, 330.0, 360.0),
        sample(Grade::C, 190.0, 200.0),
        // 250 g sits on the B threshold
        sample(Grade::C, 240.0, 250.0),
        // unusable readings
        sample(Grade::A, 400.0, f64::NAN),
        sample(Grade::A, 400.0, 0.0),
    ];

    let metrics = evaluate(samples, &GradingPolicy::default());

    assert_eq!(metrics.samples, 5);
    assert_eq!(metrics.confusion, [[1, 1, 0], [0, 1, 1], [0, 0, 1]]);
    assert_close(metrics.accuracy, 0.6, 1e-12);

    let a = metrics.class(Grade::A).expect("grade A");
    assert_close(a.precision, 1.0, 1e-12);
    assert_close(a.recall, 0.5, 1e-12);
    assert_close(a.f1, 2.0 / 3.0, 1e-12);
    assert_eq!(a.support, 2);

    let b = metrics.class(Grade::B).expect("grade B");
    assert_close(b.precision, 0.5, 1e-12);
    assert_close(b.recall, 0.5, 1e-12);
    assert_close(b.f1, 0.5, 1e-12);

    let c = metrics.class(Grade::C).expect("grade C");
    assert_close(c.precision, 0.5, 1e-12);
    assert_close(c.recall, 1.0, 1e-12);
    assert_eq!(c.support, 1);

    assert_close(metrics.macro_precision, 2.0 / 3.0, 1e-12);
    assert_close(metrics.macro_recall, 2.0 / 3.0, 1e-12);
    assert_close(metrics.macro_f1, (2.0 / 3.0 + 0.5 + 2.0 / 3.0) / 3.0, 1e-12);

    assert_close(metrics.weight_mae_g, 16.0, 1e-9);
    assert_close(metrics.weight_bias_g, -12.0, 1e-9);
}

#[test]
fn test_evaluate_follows_policy_thresholds() {
    let policy = GradingPolicy {
        weight_a_g: 500.0,
        weight_b_g: 300.0,
        ..GradingPolicy::default()
    };
    let metrics = evaluate([sample(Grade::B, 400.0, 400.0)], &policy);
    assert_eq!(metrics.accuracy, 1.0);
    assert_eq!(metrics.confusion[1][1], 1);

    let metrics = evaluate([sample(Grade::B, 400.0, 400.0)], &GradingPolicy::default());
    assert_eq!(metrics.accuracy, 0.0);
    assert_eq!(metrics.confusion[0][1], 1);
}

#[test]
fn test_evaluate_macro_skips_absent_grades() {
    let metrics = evaluate(
        [sample(Grade::A, 360.0, 400.0), sample(Grade::A, 420.0, 380.0)],
        &GradingPolicy::default(),
    );
    assert_eq!(metrics.accuracy, 1.0);
    assert_eq!(metrics.macro_f1, 1.0);
    assert_eq!(metrics.class(Grade::C).map(|c| c.f1), Some(0.0));
    assert_close(metrics.weight_bias_g, 0.0, 1e-12);
}

#[test]
fn test_evaluate_without_samples() {
    let metrics = evaluate(Vec::new(), &GradingPolicy::default());
    assert_eq!(metrics.samples, 0);
    assert_eq!(metrics.accuracy, 0.0);
    assert_eq!(metrics.macro_f1, 0.0);
    assert_eq!(metrics.weight_mae_g, 0.0);
    assert_eq!(metrics.confusion, [[0; 3]; 3]);
    assert_eq!(metrics.classes.len(), GRADES.len());
}

#[test]
fn test_metrics_summary() {
    let metrics = evaluate([sample(Grade::A, 390.0, 400.0)], &GradingPolicy::default());
    assert_eq!(
        metrics.to_string(),
        "1 samples, accuracy 1.000, macro F1 1.000, weight MAE 10.0 g (bias -10.0 g)"
    );
}
