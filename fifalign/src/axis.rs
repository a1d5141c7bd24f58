//! Image axes and the axis selector accepted by the marginal-sum centroiders.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Error, Result};

/// A single image axis. `X` runs along columns, `Y` along rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::X, Axis::Y];

    /// The axis the marginal profile averages over.
    #[inline]
    pub fn orthogonal(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// Which axes a centroider should solve for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AxisSelector {
    X,
    Y,
    #[default]
    Both,
}

impl AxisSelector {
    /// Parse `"x"`, `"y"` or `"both"` (case-insensitive).
    pub fn parse(value: &str) -> Result<Self> {
        <Self as FromStr>::from_str(value.trim())
            .map_err(|_| Error::InvalidAxisSelector(value.to_string()))
    }

    pub fn axes(self) -> &'static [Axis] {
        match self {
            AxisSelector::X => &[Axis::X],
            AxisSelector::Y => &[Axis::Y],
            AxisSelector::Both => &Axis::BOTH,
        }
    }

    #[inline]
    pub fn includes(self, axis: Axis) -> bool {
        self.axes().contains(&axis)
    }
}
