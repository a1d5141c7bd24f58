//! Synthetic through-focus sweep: centroid every frame, solve best focus and
//! check it against the nominal focal surface.
//!
//! ```sh
//! cargo run -p fifalign --example focus_sweep
//! ```

use anyhow::Context;
use glam::DVec2;

use fifalign::{
    focus, measure_stack, BatchConfig, FocusConfig, Image, NominalPosition, NominalTable,
};

const TRUE_FOCUS: f64 = 310.0;
const FIF_LABEL: &str = "FIF_A";

/// Spot whose width grows with defocus while its flux stays constant.
fn frame(distance: f64, center: DVec2) -> Image {
    let (width, height) = (160, 120);
    let sigma = 1.5 + 0.02 * (distance - TRUE_FOCUS).abs();
    let amplitude = 20_000.0 / (sigma * sigma);
    let inv_2sigma2 = 0.5 / (sigma * sigma);
    let pixels = (0..width * height)
        .map(|i| {
            let dx = (i % width) as f64 - center.x;
            let dy = (i / width) as f64 - center.y;
            200.0 + amplitude * (-(dx * dx + dy * dy) * inv_2sigma2).exp()
        })
        .collect();
    Image::new(width, height, pixels)
}

fn main() -> anyhow::Result<()> {
    common::setup_logging("info", Some("focus_sweep"))?;

    let nominal_pixel = DVec2::new(80.0, 60.0);
    let distances: Vec<f64> = (0..9).map(|i| 150.0 + 40.0 * i as f64).collect();
    let images: Vec<Image> = distances
        .iter()
        .enumerate()
        .map(|(i, &d)| frame(d, nominal_pixel + DVec2::new(0.15 * i as f64, -0.1 * i as f64)))
        .collect();

    let report = measure_stack(&images, &BatchConfig::default());
    tracing::info!(
        successes = report.successes(),
        failures = report.failures(),
        "centroids measured"
    );
    for (index, offset) in report.offset_from(nominal_pixel) {
        tracing::info!(
            distance = distances[index],
            dx = offset.x,
            dy = offset.y,
            "offset from nominal pixel"
        );
    }

    let solution = focus::solve_focus_stack(
        distances.iter().copied().zip(images.iter()),
        &FocusConfig::default(),
    )
    .context("focus curve could not be solved")?;

    let table = NominalTable::from_entries([(
        FIF_LABEL,
        NominalPosition {
            x: 199.28,
            y: -345.15,
            z: 0.0,
        },
    )]);
    let nominal = table.nominal_focus(FIF_LABEL)?;
    // Stage reading TRUE_FOCUS sits on the nominal focal surface.
    let check = table.check_focus(FIF_LABEL, nominal + (solution.best_focus - TRUE_FOCUS), 5.0)?;

    tracing::info!(
        best_focus = solution.best_focus,
        v_shaped = solution.is_v_shaped(),
        delta = check.delta,
        pass = check.pass,
        "focus sweep done"
    );
    Ok(())
}
