// src/trajectory.rs
//
// Space-time output of one integration run, plus its persisted form.
//
// Persisted record layout (column per sample time):
//   spin_history : 3N rows x T columns, row 3i+k = component k of site i
//   time_points  : T sample times
// N is inferred as rows / 3.

use std::fs::{File, create_dir_all};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chain::ChainField;
use crate::error::ChainError;

/// Ordered (time, configuration) samples. Write-once: no mutation after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Vec<f64>,
    frames: Vec<ChainField>,
}

impl Trajectory {
    pub fn new(times: Vec<f64>, frames: Vec<ChainField>) -> Result<Self, ChainError> {
        if times.len() != frames.len() {
            return Err(ChainError::LengthMismatch {
                expected: times.len(),
                got: frames.len(),
            });
        }
        if let Some(first) = frames.first() {
            let n = first.len();
            if let Some(bad) = frames.iter().find(|f| f.len() != n) {
                return Err(ChainError::LengthMismatch {
                    expected: n,
                    got: bad.len(),
                });
            }
        }
        Ok(Self { times, frames })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn frames(&self) -> &[ChainField] {
        &self.frames
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Number of chain sites (0 for an empty trajectory).
    pub fn n_sites(&self) -> usize {
        self.frames.first().map_or(0, ChainField::len)
    }

    /// Iterate over (time, configuration) pairs.
    pub fn samples(&self) -> impl Iterator<Item = (f64, &ChainField)> + '_ {
        self.times.iter().copied().zip(self.frames.iter())
    }

    /// Last configuration, if any.
    pub fn last(&self) -> Option<&ChainField> {
        self.frames.last()
    }

    pub fn to_record(&self) -> TrajectoryRecord {
        let n = self.n_sites();
        let mut spin_history = vec![Vec::with_capacity(self.len()); 3 * n];
        for frame in &self.frames {
            for (i, s) in frame.data.iter().enumerate() {
                for k in 0..3 {
                    spin_history[3 * i + k].push(s[k]);
                }
            }
        }
        TrajectoryRecord {
            spin_history,
            time_points: self.times.clone(),
        }
    }

    pub fn from_record(record: &TrajectoryRecord) -> Result<Self, ChainError> {
        let rows = record.spin_history.len();
        let t_len = record.time_points.len();

        // No samples: an empty trajectory, site count not recoverable.
        if t_len == 0 && record.spin_history.iter().all(Vec::is_empty) {
            if rows % 3 != 0 {
                return Err(ChainError::MalformedTrajectory(format!(
                    "spin_history has {} rows; expected a multiple of 3",
                    rows
                )));
            }
            return Self::new(Vec::new(), Vec::new());
        }
        if rows == 0 || rows % 3 != 0 {
            return Err(ChainError::MalformedTrajectory(format!(
                "spin_history has {} rows; expected a positive multiple of 3",
                rows
            )));
        }
        if let Some((r, row)) = record
            .spin_history
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != t_len)
        {
            return Err(ChainError::MalformedTrajectory(format!(
                "row {} has {} samples but there are {} time points",
                r,
                row.len(),
                t_len
            )));
        }

        let n = rows / 3;
        let frames = (0..t_len)
            .map(|t| {
                ChainField::from_vec(
                    (0..n)
                        .map(|i| {
                            [
                                record.spin_history[3 * i][t],
                                record.spin_history[3 * i + 1][t],
                                record.spin_history[3 * i + 2][t],
                            ]
                        })
                        .collect(),
                )
            })
            .collect();

        Self::new(record.time_points.clone(), frames)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ChainError> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let w = BufWriter::new(File::create(path)?);
        serde_json::to_writer(w, &self.to_record())?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self, ChainError> {
        let r = BufReader::new(File::open(path)?);
        let record: TrajectoryRecord = serde_json::from_reader(r)?;
        Self::from_record(&record)
    }
}

/// On-disk trajectory: flattened spin history (3N x T) and sample times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    #[serde(rename = "S_history")]
    pub spin_history: Vec<Vec<f64>>,
    pub time_points: Vec<f64>,
}

impl TrajectoryRecord {
    /// Sites implied by the row count.
    pub fn n_sites(&self) -> usize {
        self.spin_history.len() / 3
    }
}
