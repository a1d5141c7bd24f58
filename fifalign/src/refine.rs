//! Iterative GMS re-centering.
//!
//! Each step re-runs the Gaussian marginal-sum centroid on a window centered
//! at the previous estimate until the displacement between consecutive
//! estimates drops below tolerance.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fit::FitConfig;
use crate::image::Image;
use crate::marginal::gms_point;

/// Distance used to compare consecutive estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceMetric {
    #[default]
    Euclidean,
    /// Largest per-axis displacement.
    Chebyshev,
}

impl ConvergenceMetric {
    pub fn distance(self, a: DVec2, b: DVec2) -> f64 {
        let d = (a - b).abs();
        match self {
            ConvergenceMetric::Euclidean => d.length(),
            ConvergenceMetric::Chebyshev => d.max_element(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    pub max_iterations: usize,
    /// Displacement in pixels at which the estimate counts as stable.
    pub tolerance: f64,
    pub metric: ConvergenceMetric,
    /// Half-width of the square GMS window.
    pub half_width: usize,
    pub fit: FitConfig,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            tolerance: 0.01,
            metric: ConvergenceMetric::Euclidean,
            half_width: 10,
            fit: FitConfig::default(),
        }
    }
}

impl RefineConfig {
    pub fn validate(&self) {
        assert!(self.max_iterations > 0, "max_iterations must be positive");
        assert!(self.tolerance > 0.0, "tolerance must be positive");
        assert!(self.half_width > 0, "half_width must be positive");
        self.fit.validate();
    }
}

/// Converged refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct Refined {
    pub position: DVec2,
    pub uncertainty: Option<DVec2>,
    /// Number of GMS steps run.
    pub iterations: usize,
    /// Seed followed by every estimate.
    pub history: Vec<DVec2>,
}

/// Where a [`Refinement`] stands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefineState {
    Seeded,
    Iterating { iteration: usize, displacement: f64 },
    Converged,
    Failed,
}

/// Stepwise refinement, for callers that want to observe each iterate.
#[derive(Debug)]
pub struct Refinement<'a> {
    image: &'a Image,
    config: RefineConfig,
    state: RefineState,
    current: DVec2,
    uncertainty: Option<DVec2>,
    history: Vec<DVec2>,
}

impl<'a> Refinement<'a> {
    pub fn new(image: &'a Image, seed: DVec2, config: &RefineConfig) -> Self {
        config.validate();
        Self {
            image,
            config: *config,
            state: RefineState::Seeded,
            current: seed,
            uncertainty: None,
            history: vec![seed],
        }
    }

    #[inline]
    pub fn state(&self) -> RefineState {
        self.state
    }

    /// Latest estimate.
    #[inline]
    pub fn current(&self) -> DVec2 {
        self.current
    }

    /// Run one GMS step. Stepping a finished refinement is a no-op.
    pub fn step(&mut self) -> Result<RefineState> {
        let iteration = match self.state {
            RefineState::Seeded => 1,
            RefineState::Iterating { iteration, .. } => iteration + 1,
            RefineState::Converged | RefineState::Failed => return Ok(self.state),
        };

        let half = self.config.half_width;
        let estimate = match gms_point(self.image, self.current, half, half, &self.config.fit) {
            Ok(estimate) => estimate,
            Err(err) => {
                self.state = RefineState::Failed;
                tracing::debug!(iteration, error = %err, "refinement step failed");
                return Err(if iteration == 1 {
                    Error::InitialCentroidFailed(Box::new(err))
                } else {
                    Error::RefinementStepFailed {
                        iteration,
                        source: Box::new(err),
                    }
                });
            }
        };

        let next = estimate.position;
        let displacement = self.config.metric.distance(next, self.current);
        self.current = next;
        self.uncertainty = estimate.uncertainty;
        self.history.push(next);

        if displacement <= self.config.tolerance {
            self.state = RefineState::Converged;
        } else if iteration >= self.config.max_iterations {
            self.state = RefineState::Failed;
            return Err(Error::RefinementDidNotConverge {
                iterations: iteration,
                displacement,
            });
        } else {
            self.state = RefineState::Iterating {
                iteration,
                displacement,
            };
        }
        Ok(self.state)
    }

    /// Step until converged or failed.
    pub fn run(mut self) -> Result<Refined> {
        loop {
            if self.step()? == RefineState::Converged {
                break;
            }
        }

        let iterations = self.history.len() - 1;
        tracing::debug!(
            x = self.current.x,
            y = self.current.y,
            iterations,
            "centroid refinement converged"
        );
        Ok(Refined {
            position: self.current,
            uncertainty: self.uncertainty,
            iterations,
            history: self.history,
        })
    }
}

/// Refine `seed` to a stable GMS centroid.
pub fn refine(image: &Image, seed: DVec2, config: &RefineConfig) -> Result<Refined> {
    Refinement::new(image, seed, config).run()
}
