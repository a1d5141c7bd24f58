use super::*;
use crate::axis::AxisSelector;
use crate::fit::FitConfig;
use crate::marginal::gms;
use crate::peak::{find_peak, BoundsPolicy};
use crate::testing::gaussian_blob;

fn blob() -> Image {
    gaussian_blob(64, 64, DVec2::new(30.3, 27.8), 2.0, 1000.0, 100.0)
}

#[test]
fn test_fwhm_estimate_counts_pixels_above_half_max() {
    // sigma 2 => half maximum inside r < 2.35 px, about 18 pixels
    let fwhm = estimate_fwhm(&blob());
    assert!(fwhm > 3.5 && fwhm < 5.0, "fwhm = {fwhm}");
}

#[test]
fn test_fwhm_estimate_of_flat_image_is_zero() {
    let flat = Image::new_filled(9, 9, 5.0);
    assert_eq!(estimate_fwhm(&flat), 0.0);
}

#[test]
fn test_half_box() {
    assert_eq!(half_box(0.0), 2);
    assert_eq!(half_box(4.24), 2);
    assert_eq!(half_box(5.29), 3);
    assert_eq!(half_box(6.32), 4);
}

#[test]
fn test_recovers_gaussian_center() {
    let image = blob();
    let result = derivative_centroids(&image, &[DVec2::new(31.0, 28.0)], &DerivativeConfig::default());
    let centroid = result[0].as_ref().unwrap();
    assert_eq!(centroid.anchor, (30, 28));
    assert!((centroid.position.x - 30.3).abs() < 0.1);
    assert!((centroid.position.y - 27.8).abs() < 0.1);
    assert_eq!(
        centroid.position,
        DVec2::new(30.0, 28.0) - centroid.offset
    );
}

#[test]
fn test_agrees_with_gms() {
    let image = gaussian_blob(64, 64, DVec2::new(33.6, 29.2), 2.5, 1000.0, 100.0);
    let search = DerivativeSearch::new(&image, &DerivativeConfig::default());
    assert_eq!(search.half_box(), 3);
    let derivative = search.locate(&image, DVec2::new(33.0, 29.0)).unwrap();

    let marginal = gms(
        &image,
        DVec2::new(33.0, 29.0),
        10,
        10,
        AxisSelector::Both,
        &FitConfig::default(),
    )
    .unwrap()
    .position()
    .unwrap();

    assert!((derivative.position - marginal).abs().max_element() < 0.3);
}

#[test]
fn test_extended_search_box_finds_same_peak() {
    let image = blob();
    let config = DerivativeConfig {
        extend_box: 2,
        ..DerivativeConfig::default()
    };
    let plain = derivative_centroids(&image, &[DVec2::new(31.0, 28.0)], &DerivativeConfig::default());
    let extended = derivative_centroids(&image, &[DVec2::new(31.0, 28.0)], &config);
    assert_eq!(plain[0].as_ref().unwrap(), extended[0].as_ref().unwrap());
}

#[test]
fn test_guess_near_edge_is_out_of_bounds() {
    let image = gaussian_blob(64, 64, DVec2::new(1.5, 30.0), 2.0, 1000.0, 100.0);
    let search = DerivativeSearch::new(&image, &DerivativeConfig::default());
    let nhalf = search.half_box();
    let guess = DVec2::new(1.0, 30.0);

    let err = search.locate(&image, guess).unwrap_err();
    assert!(matches!(err, Error::RegionOutOfBounds { x: 1, y: 30, .. }));

    let err = find_peak(&image, guess, nhalf, BoundsPolicy::Reject).unwrap_err();
    assert!(matches!(err, Error::RegionOutOfBounds { .. }));
}

#[test]
fn test_reanchored_box_near_edge_is_out_of_bounds() {
    let mut image = Image::new_filled(20, 20, 0.0);
    image[(1, 10)] = 50.0;
    let config = DerivativeConfig {
        extend_box: 2,
        ..DerivativeConfig::default()
    };
    // Search box around x = 4 fits, the box around the peak at x = 1 does not
    let result = derivative_centroids(&image, &[DVec2::new(4.0, 10.0)], &config);
    assert!(matches!(
        result[0],
        Err(Error::RegionOutOfBounds { x: 1, y: 10, .. })
    ));
}

#[test]
fn test_flat_box_violates_monotonicity() {
    let flat = Image::new_filled(9, 9, 5.0);
    let result = derivative_centroids(&flat, &[DVec2::new(4.0, 4.0)], &DerivativeConfig::default());
    assert!(matches!(
        result[0],
        Err(Error::MonotonicityViolation { axis: Axis::X })
    ));
}

#[test]
fn test_offset_outside_box_is_rejected() {
    // Steep ramp along x with a spike at the center: the weighted derivative
    // puts the zero crossing beyond the box edge.
    let mut image = Image::new(9, 9, (0..81).map(|i| 3.0 * (i % 9) as f64).collect());
    image[(4, 4)] += 10.0;
    let config = DerivativeConfig {
        fwhm: Some(3.2),
        ..DerivativeConfig::default()
    };

    let result = derivative_centroids(&image, &[DVec2::new(4.0, 4.0)], &config);
    let Err(Error::CentroidOutOfBox {
        axis,
        offset,
        half_size,
    }) = result[0]
    else {
        panic!("expected CentroidOutOfBox, got {:?}", result[0]);
    };
    assert_eq!(axis, Axis::X);
    assert_eq!(half_size, 2);
    assert!((offset + 3.15).abs() < 1e-9);
}

#[test]
fn test_tied_maxima_are_averaged() {
    let mut image = Image::new_filled(9, 9, 0.0);
    image[(3, 4)] = 5.0;
    image[(5, 4)] = 5.0;
    let window = Window::strict(4, 4, 3, &image).unwrap();
    assert_eq!(tied_max(&image, &window), (4, 4));

    image[(5, 4)] = 0.0;
    image[(3, 6)] = 5.0;
    assert_eq!(tied_max(&image, &window), (3, 5));
}

#[test]
fn test_stack_measures_each_image() {
    let images = vec![
        blob(),
        gaussian_blob(48, 40, DVec2::new(30.3, 27.8), 2.0, 1000.0, 100.0),
        blob(),
    ];
    let guesses = [DVec2::new(31.0, 28.0), DVec2::new(1.0, 1.0)];
    let results = centroid_stack(&images, &guesses, &DerivativeConfig::default());

    assert_eq!(results.len(), 3);
    for per_image in &results {
        assert_eq!(per_image.len(), 2);
        let centroid = per_image[0].as_ref().unwrap();
        assert!((centroid.position.x - 30.3).abs() < 0.1);
        assert!(per_image[1].as_ref().unwrap_err().is_out_of_bounds());
    }
}
