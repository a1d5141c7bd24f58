//! Gaussian profile models and the least-squares solver that fits them.

pub mod lm;
pub mod models;

pub use lm::{optimize, FitConfig, FitResult, MAX_ITERATION_CEILING};
pub use models::{
    gaussian, gaussian_with_background, two_gaussians, FitModel, Gaussian,
    GaussianWithBackground, TwoGaussians,
};
