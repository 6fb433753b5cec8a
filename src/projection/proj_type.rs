use std::{fmt, str::FromStr};

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::TrakErr;

/// The distribution the entries of a projection matrix are drawn from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionType {
    /// I.i.d. standard normal entries.
    #[default]
    Normal,
    /// I.i.d. `±1` entries with equal probability.
    Rademacher,
}

impl ProjectionType {
    /// Draws a single matrix entry.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> f32 {
        match self {
            ProjectionType::Normal => rng.sample(StandardNormal),
            ProjectionType::Rademacher => {
                if rng.random::<bool>() {
                    1.
                } else {
                    -1.
                }
            }
        }
    }
}

impl FromStr for ProjectionType {
    type Err = TrakErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(ProjectionType::Normal),
            "rademacher" => Ok(ProjectionType::Rademacher),
            other => Err(TrakErr::Config(format!("unknown projection type `{other}`"))),
        }
    }
}

impl fmt::Display for ProjectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionType::Normal => write!(f, "normal"),
            ProjectionType::Rademacher => write!(f, "rademacher"),
        }
    }
}
