// src/params.rs

use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// Coupling constants of the chain Hamiltonian (dimensionless, in units of J).
///
/// - `j`  : isotropic nearest-neighbour exchange
/// - `d`  : DMI strength, DMI vector fixed along the chain normal (z)
/// - `da` : uniaxial anisotropy along z; negative = easy axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CouplingParameters {
    pub j: f64,
    pub d: f64,
    pub da: f64,
}

impl CouplingParameters {
    pub fn new(j: f64, d: f64, da: f64) -> Self {
        Self { j, d, da }
    }

    /// Build from ratios D/J and Da/J, as used by phase scans.
    pub fn from_ratios(j: f64, d_over_j: f64, da_over_j: f64) -> Self {
        Self {
            j,
            d: d_over_j * j,
            da: da_over_j * j,
        }
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if !self.j.is_finite() {
            return Err(ChainError::InvalidParameter {
                field: "j",
                constraint: "finite",
            });
        }
        if !self.d.is_finite() {
            return Err(ChainError::InvalidParameter {
                field: "d",
                constraint: "finite",
            });
        }
        if !self.da.is_finite() {
            return Err(ChainError::InvalidParameter {
                field: "da",
                constraint: "finite",
            });
        }
        Ok(())
    }
}

impl Default for CouplingParameters {
    fn default() -> Self {
        Self {
            j: 1.0,
            d: 0.25,
            da: -0.10,
        }
    }
}

/// Parameters for the LLG equation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LlgParams {
    pub gamma: f64, // gyromagnetic ratio (scaled)
    pub alpha: f64, // Gilbert damping
}

impl LlgParams {
    pub fn validate(&self) -> Result<(), ChainError> {
        if !self.gamma.is_finite() {
            return Err(ChainError::InvalidParameter {
                field: "gamma",
                constraint: "finite",
            });
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(ChainError::InvalidParameter {
                field: "alpha",
                constraint: "finite and alpha >= 0",
            });
        }
        Ok(())
    }
}

impl Default for LlgParams {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            alpha: 0.05,
        }
    }
}
