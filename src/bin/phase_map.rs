// src/bin/phase_map.rs
//
// Static phase map: relax a random chain at every (Da/J, D/J) grid point and
// label the result H / SL / FM.
//
// Grid (defaults): D/J in linspace(0.1, 1.0, 20), Da/J in linspace(0.0, -0.5, 20).
// Each grid point is an independent relaxation; points run in parallel.
//
// Run:
//   cargo run --release --bin phase_map
//   cargo run --release --bin phase_map -- n=100 nd=10 nda=10 seed=1 out=out/phase_map_small
//
// Output:
//   out/phase_map/
//     ├── config.json
//     └── phase_map.json   (labels[i_da][i_d], plus per-point diagnostics)

use std::env;
use std::error::Error;
use std::fs::{File, create_dir_all};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use soliton_chain::ground_state::{GroundStateSettings, find_ground_state};
use soliton_chain::params::CouplingParameters;
use soliton_chain::phase::{Phase, PhaseDiagnostics, diagnose};

#[derive(Serialize)]
struct PhaseMapConfig {
    binary: String,
    n_sites: usize,
    j: f64,
    d_over_j: Vec<f64>,
    da_over_j: Vec<f64>,
    ground_state: GroundStateSettings,
}

#[derive(Serialize)]
struct PointRecord {
    da_over_j: f64,
    d_over_j: f64,
    seed: Option<u64>,
    steps: usize,
    converged: bool,
    diagnostics: PhaseDiagnostics,
}

#[derive(Serialize)]
struct PhaseMap {
    d_over_j: Vec<f64>,
    da_over_j: Vec<f64>,
    /// Row per Da/J value, column per D/J value.
    labels: Vec<Vec<Phase>>,
    points: Vec<PointRecord>,
}

fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => (0..n)
            .map(|k| a + (b - a) * k as f64 / (n - 1) as f64)
            .collect(),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut n_sites = 200usize;
    let j = 1.0;
    let mut nd = 20usize;
    let mut nda = 20usize;
    let mut base_seed: Option<u64> = None;
    let mut max_steps = GroundStateSettings::default().max_steps;
    let mut out_dir = PathBuf::from("out").join("phase_map");

    for arg in env::args().skip(1) {
        if let Some(v) = arg.strip_prefix("n=") {
            n_sites = v.parse().unwrap_or(n_sites);
        } else if let Some(v) = arg.strip_prefix("nd=") {
            nd = v.parse().unwrap_or(nd);
        } else if let Some(v) = arg.strip_prefix("nda=") {
            nda = v.parse().unwrap_or(nda);
        } else if let Some(v) = arg.strip_prefix("seed=") {
            base_seed = v.parse().ok();
        } else if let Some(v) = arg.strip_prefix("steps=") {
            max_steps = v.parse().unwrap_or(max_steps);
        } else if let Some(v) = arg.strip_prefix("out=") {
            out_dir = PathBuf::from(v);
        } else {
            log::warn!("ignoring unknown argument '{arg}'");
        }
    }

    let d_over_j = linspace(0.1, 1.0, nd);
    let da_over_j = linspace(0.0, -0.5, nda);
    let settings = GroundStateSettings {
        max_steps,
        ..GroundStateSettings::default()
    };

    create_dir_all(&out_dir)?;
    let cfg = PhaseMapConfig {
        binary: "phase_map".to_string(),
        n_sites,
        j,
        d_over_j: d_over_j.clone(),
        da_over_j: da_over_j.clone(),
        ground_state: GroundStateSettings {
            seed: base_seed,
            ..settings
        },
    };
    serde_json::to_writer_pretty(File::create(out_dir.join("config.json"))?, &cfg)?;

    log::info!(
        "phase map: N={} grid {}x{} ({} relaxations)",
        n_sites,
        nda,
        nd,
        nda * nd
    );
    let started = Instant::now();

    let grid: Vec<(usize, usize)> = (0..nda).flat_map(|i| (0..nd).map(move |k| (i, k))).collect();

    // Per-point seeds derive from the base seed so the whole map is reproducible.
    let results: Vec<Result<PointRecord, soliton_chain::ChainError>> = grid
        .par_iter()
        .map(|&(i, k)| {
            let coupling = CouplingParameters::from_ratios(j, d_over_j[k], da_over_j[i]);
            let point_settings = GroundStateSettings {
                seed: base_seed.map(|s| s.wrapping_add((i * nd + k) as u64)),
                ..settings
            };
            let (m, report) = find_ground_state(n_sites, &coupling, &point_settings)?;
            let diagnostics = diagnose(&m);
            log::info!(
                "Da/J={:+.3} D/J={:.3} -> {} (steps={}, converged={})",
                da_over_j[i],
                d_over_j[k],
                diagnostics.phase,
                report.steps,
                report.converged
            );
            Ok(PointRecord {
                da_over_j: da_over_j[i],
                d_over_j: d_over_j[k],
                seed: report.seed,
                steps: report.steps,
                converged: report.converged,
                diagnostics,
            })
        })
        .collect();

    let points = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    let labels: Vec<Vec<Phase>> = points
        .chunks(nd.max(1))
        .map(|row| row.iter().map(|p| p.diagnostics.phase).collect())
        .collect();

    let unconverged = points.iter().filter(|p| !p.converged).count();
    if unconverged > 0 {
        log::warn!("{} of {} relaxations did not converge", unconverged, points.len());
    }

    let map = PhaseMap {
        d_over_j,
        da_over_j,
        labels,
        points,
    };
    let w = BufWriter::new(File::create(out_dir.join("phase_map.json"))?);
    serde_json::to_writer_pretty(w, &map)?;

    log::info!(
        "phase map written to {} in {:.1} s",
        out_dir.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
