//! Nominal focus from the aspheric focal surface, and the fiducial table it
//! is evaluated on.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Radius of curvature of the focal surface.
const INV_C: f64 = -4977.99;
const A4: f64 = -2.9648e-10;
const A6: f64 = 3.4523e-15;
const A8: f64 = -1.8042e-20;
const A10: f64 = 3.2571e-26;

/// Sag of the focal surface at planar position `(x, y)`.
pub fn aspheric_z(x: f64, y: f64) -> f64 {
    let r2 = x * x + y * y;
    let conic = r2 / INV_C / (1.0 + (1.0 - r2 / (INV_C * INV_C)).sqrt());
    let r4 = r2 * r2;
    conic + A4 * r4 + A6 * r4 * r2 + A8 * r4 * r4 + A10 * r4 * r4 * r2
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NominalPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Immutable label → nominal position lookup for fiducials and sensors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NominalTable {
    entries: BTreeMap<String, NominalPosition>,
}

impl NominalTable {
    pub fn from_entries<S: Into<String>>(
        entries: impl IntoIterator<Item = (S, NominalPosition)>,
    ) -> Self {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Load a YAML or JSON map of label to `{x, y, z}`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(common::load_file(path)?)
    }

    pub fn get(&self, label: &str) -> Result<&NominalPosition> {
        self.entries
            .get(label)
            .ok_or_else(|| Error::UnknownFiducial(label.to_string()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expected focus Z at the fiducial's planar position.
    pub fn nominal_focus(&self, label: &str) -> Result<f64> {
        let p = self.get(label)?;
        Ok(aspheric_z(p.x, p.y))
    }

    /// Compare a measured best focus against the fiducial's nominal focus.
    pub fn check_focus(&self, label: &str, best_focus: f64, tolerance: f64) -> Result<FocusCheck> {
        let nominal = self.nominal_focus(label)?;
        let check = FocusCheck::new(best_focus, nominal, tolerance);
        tracing::info!(
            label,
            best_focus,
            nominal,
            delta = check.delta,
            pass = check.pass,
            "focus check"
        );
        Ok(check)
    }
}

/// Measured best focus against the nominal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusCheck {
    pub best_focus: f64,
    pub nominal: f64,
    /// `best_focus - nominal`.
    pub delta: f64,
    pub tolerance: f64,
    pub pass: bool,
}

impl FocusCheck {
    pub fn new(best_focus: f64, nominal: f64, tolerance: f64) -> Self {
        let delta = best_focus - nominal;
        Self {
            best_focus,
            nominal,
            delta,
            tolerance,
            pass: delta.abs() <= tolerance,
        }
    }
}
