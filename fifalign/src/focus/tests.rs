use super::*;

fn samples(distances: &[f64], scores: &[f64]) -> Vec<FocusSample> {
    distances
        .iter()
        .zip(scores)
        .map(|(&distance, &score)| FocusSample { distance, score })
        .collect()
}

/// Two-pixel image `[0, 2s]` has population standard deviation `s`.
fn image_with_score(score: f64) -> Image {
    Image::new(2, 1, vec![0.0, 2.0 * score])
}

const V_DISTANCES: [f64; 5] = [100.0, 200.0, 300.0, 400.0, 500.0];
const V_SCORES: [f64; 5] = [50.0, 20.0, 5.0, 25.0, 60.0];

#[test]
fn test_v_curve_best_focus_near_vertex() {
    let solution =
        solve_focus_curve(&samples(&V_DISTANCES, &V_SCORES), &FocusConfig::default()).unwrap();

    assert!((solution.best_focus - 300.0).abs() < 30.0, "{}", solution.best_focus);
    assert!(solution.left.slope < 0.0);
    assert!(solution.right.slope > 0.0);
    assert!(solution.is_v_shaped());

    // Vertex of the least-squares parabola
    assert!((solution.split - 289.394).abs() < 1e-2);
    // Left line through (100, 50), (200, 20); right fitted over 300..500
    assert!((solution.left.slope + 0.3).abs() < 1e-12);
    assert!((solution.right.slope - 0.275).abs() < 1e-12);
    assert!((solution.best_focus - 160.0 / 0.575).abs() < 1e-9);
    assert!(
        (solution.score_at_best - (solution.left.slope * solution.best_focus + solution.left.intercept))
            .abs()
            < 1e-9
    );
}

#[test]
fn test_input_order_does_not_matter() {
    let mut shuffled = samples(&V_DISTANCES, &V_SCORES);
    shuffled.reverse();
    shuffled.swap(0, 2);
    let a = solve_focus_curve(&shuffled, &FocusConfig::default()).unwrap();
    let b = solve_focus_curve(&samples(&V_DISTANCES, &V_SCORES), &FocusConfig::default()).unwrap();
    assert_eq!(a.best_focus, b.best_focus);
    assert!(a.samples.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn test_vertex_outside_range_is_insufficient() {
    // Still falling at the last sample: the parabola turns beyond 400
    let result = solve_focus_curve(
        &samples(&[100.0, 200.0, 300.0, 400.0], &[60.0, 40.0, 25.0, 15.0]),
        &FocusConfig::default(),
    );
    assert!(matches!(
        result,
        Err(Error::InsufficientSamples { left: 4, right: 0 })
    ));
}

#[test]
fn test_quartic_split() {
    let distances: Vec<f64> = (0..9).map(|i| 100.0 + 50.0 * i as f64).collect();
    let scores: Vec<f64> = distances.iter().map(|d| 5.0 + 0.1 * (d - 300.0).abs()).collect();
    let solution = solve_focus_curve(&samples(&distances, &scores), &FocusConfig { order: 4 }).unwrap();

    assert!((solution.split - 300.0).abs() < 1e-6);
    assert!((solution.best_focus - 300.0).abs() < 1e-6);
    assert!((solution.score_at_best - 5.0).abs() < 1e-6);
    assert_eq!(solution.polynomial.order(), 4);
}

#[test]
fn test_order_below_two_is_unsupported() {
    let result = solve_focus_curve(&samples(&V_DISTANCES, &V_SCORES), &FocusConfig { order: 1 });
    assert!(matches!(result, Err(Error::UnsupportedPolynomialOrder(1))));
}

#[test]
fn test_too_few_samples_for_order() {
    let result = solve_focus_curve(
        &samples(&[100.0, 200.0], &[5.0, 6.0]),
        &FocusConfig::default(),
    );
    assert!(matches!(
        result,
        Err(Error::TooFewFocusSamples {
            found: 2,
            required: 3
        })
    ));
}

#[test]
fn test_repeated_distances_are_degenerate() {
    let result = solve_focus_curve(
        &samples(&[100.0, 100.0, 100.0, 100.0], &[5.0, 6.0, 7.0, 8.0]),
        &FocusConfig::default(),
    );
    assert!(matches!(result, Err(Error::DegenerateFit(_))));
}

#[test]
fn test_focus_score_is_population_std() {
    assert_eq!(focus_score(&image_with_score(7.5)), 7.5);
    assert_eq!(focus_score(&Image::new_filled(4, 4, 3.0)), 0.0);
}

#[test]
fn test_distance_from_label() {
    assert_eq!(distance_from_label("1250.fits").unwrap(), 1250.0);
    assert_eq!(distance_from_label("scans/run2/-12.5.fits").unwrap(), -12.5);
    assert_eq!(distance_from_label("300").unwrap(), 300.0);
    assert!(matches!(
        distance_from_label("focus_a.fits"),
        Err(Error::InvalidDistanceLabel(ref l)) if l == "focus_a.fits"
    ));
    assert!(distance_from_label("").is_err());
    assert!(distance_from_label("inf.fits").is_err());
}

#[test]
fn test_solve_from_labelled_images() {
    let labels: Vec<String> = V_DISTANCES.iter().map(|d| format!("{d}.fits")).collect();
    let images: Vec<Image> = V_SCORES.iter().map(|&s| image_with_score(s)).collect();

    let solution = solve_from_labelled_images(&labels, &images, &FocusConfig::default()).unwrap();
    assert!((solution.best_focus - 160.0 / 0.575).abs() < 1e-9);

    let err = solve_from_labelled_images(&labels[..3], &images, &FocusConfig::default()).unwrap_err();
    assert!(matches!(err, Error::LabelCountMismatch { labels: 3, images: 5 }));
}

#[test]
fn test_solve_focus_stack_pairs_distances() {
    let images: Vec<Image> = V_SCORES.iter().map(|&s| image_with_score(s)).collect();
    let solution = solve_focus_stack(
        V_DISTANCES.iter().copied().zip(images.iter()),
        &FocusConfig::default(),
    )
    .unwrap();
    assert_eq!(solution.samples.len(), 5);
    assert_eq!(solution.samples[2].score, 5.0);
}
