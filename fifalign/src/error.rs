use thiserror::Error;

use crate::axis::Axis;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a nonlinear least-squares fit was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FitFailure {
    #[error("no convergence after {iterations} iterations")]
    NotConverged { iterations: usize },
    #[error("normal equations are singular")]
    Singular,
    #[error("fitted sigma {sigma:.3} is not physical")]
    InvalidSigma { sigma: f64 },
    #[error("residuals are not finite")]
    NonFinite,
    #[error("only {samples} samples for {params} parameters")]
    TooFewSamples { samples: usize, params: usize },
}

/// Per-call failure of a centroiding or focus-fitting operation.
///
/// None of these are fatal: batch callers record them per item and move on.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid axis selector '{0}', expected one of: x, y, both")]
    InvalidAxisSelector(String),

    #[error("Region around ({x:.2}, {y:.2}) is empty inside a {width}x{height} image")]
    EmptyRegion {
        x: f64,
        y: f64,
        width: usize,
        height: usize,
    },

    #[error("Window has {samples} samples along {axis}, need at least {required}")]
    WindowTooSmall {
        axis: Axis,
        samples: usize,
        required: usize,
    },

    #[error(
        "Box of half-size {half_size} around ({x}, {y}) exceeds {width}x{height} image bounds"
    )]
    RegionOutOfBounds {
        x: i64,
        y: i64,
        half_size: usize,
        width: usize,
        height: usize,
    },

    #[error("Fit failed on {axis} marginal sum: {reason}")]
    FitDidNotConverge { axis: Axis, reason: FitFailure },

    #[error("Unable to compute {axis} centroid: derivative profile is not peaked")]
    MonotonicityViolation { axis: Axis },

    #[error("Computed {axis} centroid offset {offset:.3} is outside the half box of {half_size}")]
    CentroidOutOfBox {
        axis: Axis,
        offset: f64,
        half_size: usize,
    },

    #[error("Initial centroid failed")]
    InitialCentroidFailed(#[source] Box<Error>),

    #[error("Centroid refinement step {iteration} failed")]
    RefinementStepFailed {
        iteration: usize,
        #[source]
        source: Box<Error>,
    },

    #[error(
        "Centroid did not converge within {iterations} iterations (last step {displacement:.4} px)"
    )]
    RefinementDidNotConverge { iterations: usize, displacement: f64 },

    #[error("Insufficient samples for branch fit: {left} left and {right} right of split, need 2 each")]
    InsufficientSamples { left: usize, right: usize },

    #[error("Need at least {required} focus samples, got {found}")]
    TooFewFocusSamples { found: usize, required: usize },

    #[error("Degenerate fit: {0}")]
    DegenerateFit(&'static str),

    #[error("Polynomial order {0} cannot split a focus curve, need at least 2")]
    UnsupportedPolynomialOrder(usize),

    #[error("Cannot parse a focus distance from label '{0}'")]
    InvalidDistanceLabel(String),

    #[error("Labels and images differ in length: {labels} labels, {images} images")]
    LabelCountMismatch { labels: usize, images: usize },

    #[error("Unknown fiducial '{0}'")]
    UnknownFiducial(String),

    #[error("Failed to load configuration")]
    Config(#[from] common::SerdeFormatError),
}

impl Error {
    /// True for failures caused by the requested box touching the image edge.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            Error::RegionOutOfBounds { .. } | Error::EmptyRegion { .. }
        )
    }
}
