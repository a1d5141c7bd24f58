//! Configuration for batch measurement.
//!
//! Every algorithm config derives serde with `#[serde(default)]`, so a config
//! file only needs to name the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub use crate::blob::BlobLocatorConfig;
pub use crate::derivative::DerivativeConfig;
pub use crate::fit::FitConfig;
pub use crate::focus::FocusConfig;
pub use crate::marginal::SmsConfig;
pub use crate::refine::{ConvergenceMetric, RefineConfig};

use crate::error::Result;

/// Sub-pixel centroider applied to each located blob.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum CentroidMethod {
    /// Single GMS fit at the blob anchor.
    Gms,
    /// SMS bisector at the blob anchor.
    Sms,
    /// GMS iterated to convergence.
    #[default]
    Refined,
    /// Weighted-derivative search.
    Derivative,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub method: CentroidMethod,
    pub blob: BlobLocatorConfig,
    /// Window half-widths for the single-shot marginal methods.
    pub marginal: MarginalWindow,
    pub fit: FitConfig,
    pub sms: SmsConfig,
    pub refine: RefineConfig,
    pub derivative: DerivativeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginalWindow {
    pub half_x: usize,
    pub half_y: usize,
}

impl Default for MarginalWindow {
    fn default() -> Self {
        Self {
            half_x: 10,
            half_y: 10,
        }
    }
}

impl BatchConfig {
    /// Load from a `.yaml`/`.yml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = common::load_file(path)?;
        config.validate();
        Ok(config)
    }

    pub fn validate(&self) {
        assert!(
            self.marginal.half_x > 0 && self.marginal.half_y > 0,
            "marginal window half-widths must be positive"
        );
        self.blob.validate();
        self.fit.validate();
        self.sms.validate();
        self.refine.validate();
        self.derivative.validate();
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use common::FileFormat;

    use super::*;
    use crate::error::Error;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "method: sms\nsms:\n  clip_stars: true\nrefine:\n  tolerance: 0.005\n";
        let config: BatchConfig = common::deserialize(yaml, FileFormat::Yaml).unwrap();

        assert_eq!(config.method, CentroidMethod::Sms);
        assert!(config.sms.clip_stars);
        assert_eq!(config.sms.enlarge, 1.0);
        assert_eq!(config.refine.tolerance, 0.005);
        assert_eq!(config.refine.max_iterations, 5);
        assert_eq!(config.blob, BlobLocatorConfig::default());
        config.validate();
    }

    #[test]
    fn test_json_roundtrip() {
        let config = BatchConfig {
            method: CentroidMethod::Derivative,
            derivative: DerivativeConfig {
                extend_box: 3,
                fwhm: Some(4.5),
            },
            ..BatchConfig::default()
        };
        let json = common::serialize(&config, FileFormat::Json).unwrap();
        let back: BatchConfig = common::deserialize(&json, FileFormat::Json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(CentroidMethod::Refined.to_string(), "refined");
        assert_eq!(CentroidMethod::from_str("GMS").unwrap(), CentroidMethod::Gms);
        assert!(CentroidMethod::from_str("moments").is_err());
    }

    #[test]
    fn test_from_file_rejects_unknown_extension() {
        let err = BatchConfig::from_file("batch.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    #[should_panic(expected = "blur kernel extents must be odd")]
    fn test_validate_even_blur() {
        BatchConfig {
            blob: BlobLocatorConfig {
                blur_width: 2,
                ..BlobLocatorConfig::default()
            },
            ..BatchConfig::default()
        }
        .validate();
    }
}
