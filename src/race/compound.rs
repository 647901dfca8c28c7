//! Static tyre compound physics. Changing these is a code change, not a request option.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const SOFT_MODEL: CompoundModel = CompoundModel {
    lap_delta_ms: 0.0,
    wear_ms_per_lap: 80.0,
};
pub const MEDIUM_MODEL: CompoundModel = CompoundModel {
    lap_delta_ms: 400.0,
    wear_ms_per_lap: 60.0,
};
pub const HARD_MODEL: CompoundModel = CompoundModel {
    lap_delta_ms: 900.0,
    wear_ms_per_lap: 40.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    #[serde(alias = "soft")]
    Soft,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "hard")]
    Hard,
}

/// Lap-time delta against the softest compound and wear accrued per lap of stint age.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompoundModel {
    pub lap_delta_ms: f64,
    pub wear_ms_per_lap: f64,
}

impl Compound {
    pub const ALL: [Compound; 3] = [Compound::Soft, Compound::Medium, Compound::Hard];

    pub const fn model(self) -> CompoundModel {
        match self {
            Self::Soft => SOFT_MODEL,
            Self::Medium => MEDIUM_MODEL,
            Self::Hard => HARD_MODEL,
        }
    }

    pub const fn lap_delta_ms(self) -> f64 {
        self.model().lap_delta_ms
    }

    pub const fn wear_ms_per_lap(self) -> f64 {
        self.model().wear_ms_per_lap
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "SOFT",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCompound(pub String);

impl fmt::Display for UnknownCompound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown compound '{}' (expected SOFT, MEDIUM or HARD)", self.0)
    }
}

impl std::error::Error for UnknownCompound {}

impl FromStr for Compound {
    type Err = UnknownCompound;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SOFT" | "S" => Ok(Self::Soft),
            "MEDIUM" | "M" => Ok(Self::Medium),
            "HARD" | "H" => Ok(Self::Hard),
            _ => Err(UnknownCompound(s.trim().to_string())),
        }
    }
}
