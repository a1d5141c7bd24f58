//! Sub-pixel centroiding and focus-curve fitting for fiducial (FIF) and
//! pinhole alignment.
//!
//! Centroiders, from coarse to fine:
//!
//! - [`blob::locate_blob`]: blurred global maximum and a region around it.
//! - [`peak::find_peak`]: brightest pixel in a search window.
//! - [`marginal::gms`] / [`marginal::sms`]: Gaussian fits to marginal
//!   profiles, single-spot and bisector variants.
//! - [`refine::refine`]: GMS iterated to a fixed point.
//! - [`derivative::DerivativeSearch`]: closed-form weighted-derivative
//!   centroid.
//!
//! [`focus::solve_focus_curve`] estimates best focus from a through-focus
//! stack, and [`aspheric`] provides the nominal focus it is checked against.
//! [`batch::measure_stack`] runs the centroiders over many images.

pub mod aspheric;
pub mod axis;
pub mod batch;
pub mod blob;
pub mod config;
pub mod derivative;
pub mod error;
pub mod fit;
pub mod focus;
pub mod image;
pub mod marginal;
pub mod math;
pub mod peak;
pub mod refine;

#[cfg(test)]
pub(crate) mod testing;

pub use aspheric::{aspheric_z, FocusCheck, NominalPosition, NominalTable};
pub use axis::{Axis, AxisSelector};
pub use batch::{measure, measure_labelled, measure_stack, BatchReport, ItemReport, Measurement};
pub use blob::{locate_blob, BlobLocatorConfig, BlobRoi};
pub use config::{BatchConfig, CentroidMethod};
pub use derivative::{centroid_stack, DerivativeCentroid, DerivativeConfig, DerivativeSearch};
pub use error::{Error, FitFailure, Result};
pub use fit::FitConfig;
pub use focus::{FocusConfig, FocusSample, FocusSolution};
pub use image::{Image, Window};
pub use marginal::{gms, sms, AxisEstimate, MarginalCentroid, PointEstimate, SmsConfig};
pub use peak::{find_peak, BoundsPolicy, Peak};
pub use refine::{refine, RefineConfig, Refined};
