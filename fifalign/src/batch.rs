//! Per-image measurement over a stack, in parallel.
//!
//! A failed image never aborts the batch: each item carries its own
//! `Result` and the report keeps input order.

use glam::DVec2;
use rayon::prelude::*;

use crate::blob::locate_blob;
use crate::config::{BatchConfig, CentroidMethod};
use crate::derivative::DerivativeSearch;
use crate::error::{Error, Result};
use crate::image::{Image, Window};
use crate::marginal::{gms_point, sms_point};
use crate::refine::refine;

/// Sub-pixel position of the blob in one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub method: CentroidMethod,
    pub position: DVec2,
    pub uncertainty: Option<DVec2>,
    /// Coarse blob anchor the centroider started from.
    pub anchor: DVec2,
    /// Region cut by the blob locator.
    pub roi: Window,
}

#[derive(Debug)]
pub struct ItemReport {
    pub index: usize,
    pub label: Option<String>,
    pub outcome: Result<Measurement>,
}

impl ItemReport {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn successes(&self) -> usize {
        self.items.iter().filter(|i| i.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.items.len() - self.successes()
    }

    pub fn measurements(&self) -> impl Iterator<Item = (usize, &Measurement)> {
        self.items
            .iter()
            .filter_map(|i| i.outcome.as_ref().ok().map(|m| (i.index, m)))
    }

    pub fn errors(&self) -> impl Iterator<Item = (usize, &Error)> {
        self.items
            .iter()
            .filter_map(|i| i.outcome.as_ref().err().map(|e| (i.index, e)))
    }

    /// Offset of each successful measurement from `nominal`, by item index.
    pub fn offset_from(&self, nominal: DVec2) -> Vec<(usize, DVec2)> {
        self.measurements()
            .map(|(index, m)| (index, m.position - nominal))
            .collect()
    }

    /// Mean offset from `nominal` over successful items.
    pub fn mean_offset_from(&self, nominal: DVec2) -> Option<DVec2> {
        let offsets = self.offset_from(nominal);
        if offsets.is_empty() {
            return None;
        }
        let sum: DVec2 = offsets.iter().map(|(_, o)| *o).sum();
        Some(sum / offsets.len() as f64)
    }
}

/// Locate the blob and centroid it with the configured method.
pub fn measure(image: &Image, config: &BatchConfig) -> Result<Measurement> {
    let roi = locate_blob(image, &config.blob)?;
    let anchor = roi.anchor_position();
    let half = config.marginal;

    let (position, uncertainty) = match config.method {
        CentroidMethod::Gms => {
            let p = gms_point(image, anchor, half.half_x, half.half_y, &config.fit)?;
            (p.position, p.uncertainty)
        }
        CentroidMethod::Sms => {
            let p = sms_point(image, anchor, half.half_x, half.half_y, &config.sms)?;
            (p.position, p.uncertainty)
        }
        CentroidMethod::Refined => {
            let r = refine(image, anchor, &config.refine)?;
            (r.position, r.uncertainty)
        }
        CentroidMethod::Derivative => {
            let c = DerivativeSearch::new(image, &config.derivative).locate(image, anchor)?;
            (c.position, None)
        }
    };

    Ok(Measurement {
        method: config.method,
        position,
        uncertainty,
        anchor,
        roi: roi.window,
    })
}

/// Measure every image. Output order matches input order.
pub fn measure_stack(images: &[Image], config: &BatchConfig) -> BatchReport {
    measure_labelled(images.iter().map(|image| (None, image)), config)
}

/// [`measure_stack`] with a label (e.g. file name) carried into each item.
pub fn measure_labelled<'a>(
    items: impl IntoIterator<Item = (Option<String>, &'a Image)>,
    config: &BatchConfig,
) -> BatchReport {
    config.validate();
    let items: Vec<_> = items.into_iter().collect();

    let items: Vec<ItemReport> = items
        .into_par_iter()
        .enumerate()
        .map(|(index, (label, image))| {
            let outcome = measure(image, config);
            if let Err(err) = &outcome {
                tracing::warn!(index, label = label.as_deref(), error = %err, "measurement failed");
            }
            ItemReport {
                index,
                label,
                outcome,
            }
        })
        .collect();

    let report = BatchReport { items };
    tracing::debug!(
        successes = report.successes(),
        failures = report.failures(),
        "batch measured"
    );
    report
}
