// src/config.rs
//
// Run parameters and the config.json record written next to every output
// directory.

use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::io::BufReader;
use std::path::Path;

use crate::error::ChainError;
use crate::external_field::{GaussianPulse, UniformBias};
use crate::ground_state::GroundStateSettings;
use crate::kinematics::{FitWindow, MobilityWeighting};
use crate::ode::Rk45Settings;
use crate::params::{CouplingParameters, LlgParams};

/// Everything needed to reproduce one driven run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub chain: ChainConfig,
    pub coupling: CouplingParameters,
    pub llg: LlgParams,
    pub fields: FieldConfig,
    pub numerics: NumericsConfig,
    pub analysis: AnalysisConfig,
    pub run: RunInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub n_sites: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub pulse: Option<GaussianPulse>,
    pub bias: UniformBias,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericsConfig {
    pub integrator: String,
    pub t_max: f64,
    /// Spacing of saved samples.
    pub dt_save: f64,
    pub rk45: Rk45Settings,
    /// Present when the initial state came from a relaxation.
    pub ground_state: Option<GroundStateSettings>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub fit_window: FitWindow,
    pub core_threshold: f64,
    pub mobility_weighting: MobilityWeighting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub binary: String,
    pub run_id: String,

    // Optional provenance (can be filled later)
    pub git_commit: Option<String>,
    pub timestamp_utc: Option<String>,
}

impl RunConfig {
    /// Standard soliton run: N = 200, (J, D, Da) = (1, 0.25, -0.10), α = 0.05,
    /// nucleation pulse at the chain centre, no bias, t in [0, 200) saved every 0.5.
    pub fn soliton_default(binary: &str, run_id: &str) -> Self {
        let n_sites = 200;
        let coupling = CouplingParameters::default();
        Self {
            chain: ChainConfig { n_sites },
            coupling,
            llg: LlgParams::default(),
            fields: FieldConfig {
                pulse: Some(GaussianPulse::nucleation(n_sites, coupling.j)),
                bias: UniformBias::along_z(0.0),
            },
            numerics: NumericsConfig {
                integrator: "rk45".to_string(),
                t_max: 200.0,
                dt_save: 0.5,
                rk45: Rk45Settings::default(),
                ground_state: None,
            },
            analysis: AnalysisConfig {
                fit_window: FitWindow::default(),
                core_threshold: crate::kinematics::CORE_THRESHOLD,
                mobility_weighting: MobilityWeighting::default(),
            },
            run: RunInfo {
                binary: binary.to_string(),
                run_id: run_id.to_string(),
                git_commit: None,
                timestamp_utc: None,
            },
        }
    }

    pub fn write_to_dir(&self, out_dir: &Path) -> Result<(), ChainError> {
        create_dir_all(out_dir)?;
        let path = out_dir.join("config.json");
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn read_from_dir(out_dir: &Path) -> Result<Self, ChainError> {
        let file = File::open(out_dir.join("config.json"))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Record for an (alpha, h_dc) sweep. Replaces the single α and bias of the
/// base run with the scanned grids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobilityScanConfig {
    pub chain: ChainConfig,
    pub coupling: CouplingParameters,
    pub gamma: f64,
    pub alpha: Vec<f64>,
    pub h_dc: Vec<f64>,
    pub pulse: Option<GaussianPulse>,
    pub numerics: NumericsConfig,
    pub analysis: AnalysisConfig,
    pub save_traj: bool,
    pub run: RunInfo,
}

impl MobilityScanConfig {
    pub fn from_base(base: &RunConfig, alpha: Vec<f64>, h_dc: Vec<f64>, save_traj: bool) -> Self {
        Self {
            chain: base.chain,
            coupling: base.coupling,
            gamma: base.llg.gamma,
            alpha,
            h_dc,
            pulse: base.fields.pulse,
            numerics: base.numerics.clone(),
            analysis: base.analysis,
            save_traj,
            run: base.run.clone(),
        }
    }

    pub fn write_to_dir(&self, out_dir: &Path) -> Result<(), ChainError> {
        create_dir_all(out_dir)?;
        let file = File::create(out_dir.join("config.json"))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
