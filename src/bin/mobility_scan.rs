// src/bin/mobility_scan.rs
//
// Mobility versus damping: for each alpha, run the pulse-nucleated soliton
// under several static biases h_dc along z, fit each run's core velocity, then
// fit v = mu * h_dc + v_int.
//
// Grid (defaults): alpha in linspace(0.01, 0.20, 20), h_dc in linspace(-0.02, 0.02, 5).
// Every (alpha, h_dc) run is independent; runs execute in parallel.
//
// Run:
//   cargo run --release --bin mobility_scan
//   cargo run --release --bin mobility_scan -- nalpha=4 nh=3 tmax=100 weighted
//   cargo run --release --bin mobility_scan -- save_traj out=out/mu_scan
//
// Output:
//   out/mobility_scan/
//     ├── config.json      (base run plus the alpha and h_dc grids)
//     ├── velocities.csv   (alpha, h_dc, v, v_err, samples, status)
//     ├── mobility.csv     (alpha, mu, mu_err, v_int, v_int_err, points, status)
//     └── traj/            (only with `save_traj`)

use std::env;
use std::error::Error;
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use rayon::prelude::*;

use soliton_chain::chain::ChainField;
use soliton_chain::config::{MobilityScanConfig, RunConfig};
use soliton_chain::external_field::{ExternalField, GaussianPulse, UniformBias};
use soliton_chain::kinematics::{
    Missing, MobilityWeighting, VelocityFit, extract_velocity, fit_mobility, track_core,
};
use soliton_chain::llg::{integrate_llg, sample_times};

fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => (0..n)
            .map(|k| a + (b - a) * k as f64 / (n - 1) as f64)
            .collect(),
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(String::new, |x| format!("{:.16e}", x))
}

fn tag(x: f64) -> String {
    format!("{:.3}", x).replace('.', "p").replace('-', "m")
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut cfg = RunConfig::soliton_default("mobility_scan", "mobility_scan");
    let mut nalpha = 20usize;
    let mut nh = 5usize;
    let mut save_traj = false;
    let mut out_dir = PathBuf::from("out").join("mobility_scan");

    for arg in env::args().skip(1) {
        if let Some(v) = arg.strip_prefix("nalpha=") {
            nalpha = v.parse().unwrap_or(nalpha);
        } else if let Some(v) = arg.strip_prefix("nh=") {
            nh = v.parse().unwrap_or(nh);
        } else if let Some(v) = arg.strip_prefix("n=") {
            cfg.chain.n_sites = v.parse().unwrap_or(cfg.chain.n_sites);
        } else if let Some(v) = arg.strip_prefix("tmax=") {
            cfg.numerics.t_max = v.parse().unwrap_or(cfg.numerics.t_max);
        } else if let Some(v) = arg.strip_prefix("dt=") {
            cfg.numerics.dt_save = v.parse().unwrap_or(cfg.numerics.dt_save);
        } else if arg == "weighted" {
            cfg.analysis.mobility_weighting = MobilityWeighting::VelocityStderr;
        } else if arg == "save_traj" {
            save_traj = true;
        } else if let Some(v) = arg.strip_prefix("out=") {
            out_dir = PathBuf::from(v);
        } else {
            log::warn!("ignoring unknown argument '{arg}'");
        }
    }

    let n = cfg.chain.n_sites;
    let pulse = GaussianPulse::nucleation(n, cfg.coupling.j);
    cfg.fields.pulse = Some(pulse);

    let alphas = linspace(0.01, 0.20, nalpha);
    let h_dc = linspace(-0.02, 0.02, nh);

    create_dir_all(&out_dir)?;
    MobilityScanConfig::from_base(&cfg, alphas.clone(), h_dc.clone(), save_traj).write_to_dir(&out_dir)?;
    let traj_dir = out_dir.join("traj");
    if save_traj {
        create_dir_all(&traj_dir)?;
    }

    let t_eval = sample_times(0.0, cfg.numerics.t_max, cfg.numerics.dt_save);
    let t_span = (0.0, cfg.numerics.t_max);
    let initial = ChainField::new(n);

    log::info!(
        "mobility scan: N={} D/J={:.2} Da/J={:.2}, {} alpha x {} h_dc = {} runs",
        n,
        cfg.coupling.d / cfg.coupling.j,
        cfg.coupling.da / cfg.coupling.j,
        nalpha,
        nh,
        nalpha * nh
    );
    let started = Instant::now();

    let runs: Vec<(usize, usize)> = (0..nalpha).flat_map(|a| (0..nh).map(move |k| (a, k))).collect();

    // Integration failures stay local to their grid point.
    let velocities: Vec<Result<Result<VelocityFit, Missing>, String>> = runs
        .par_iter()
        .map(|&(a, k)| {
            let mut llg = cfg.llg;
            llg.alpha = alphas[a];
            let bias = UniformBias::along_z(h_dc[k]);
            let field = pulse.plus(bias);

            let (traj, _) = integrate_llg(
                &initial,
                &cfg.coupling,
                &llg,
                &field,
                t_span,
                &t_eval,
                &cfg.numerics.rk45,
            )
            .map_err(|e| {
                log::error!("alpha={:.3} h_dc={:+.3}: {e}", alphas[a], h_dc[k]);
                e.to_string()
            })?;

            if save_traj {
                let path = traj_dir.join(format!("traj_a{}_h{}.json", tag(alphas[a]), tag(h_dc[k])));
                if let Err(e) = traj.write_json(&path) {
                    log::warn!("could not write {}: {e}", path.display());
                }
            }

            let v = track_core(&traj, cfg.analysis.core_threshold)
                .and_then(|track| extract_velocity(&track, &cfg.analysis.fit_window));
            match &v {
                Ok(fit) => log::info!(
                    "alpha={:.3} h_dc={:+.3}: v={:+.5}",
                    alphas[a],
                    h_dc[k],
                    fit.velocity
                ),
                Err(e) => log::info!("alpha={:.3} h_dc={:+.3}: {e}", alphas[a], h_dc[k]),
            }
            Ok(v)
        })
        .collect();

    let file_v = File::create(out_dir.join("velocities.csv"))?;
    let mut writer_v = BufWriter::new(file_v);
    writeln!(writer_v, "alpha,h_dc,v,v_err,samples,status")?;

    let file_mu = File::create(out_dir.join("mobility.csv"))?;
    let mut writer_mu = BufWriter::new(file_mu);
    writeln!(writer_mu, "alpha,mu,mu_err,v_int,v_int_err,points,status")?;

    for (a, alpha) in alphas.iter().enumerate() {
        let row = &velocities[a * nh..(a + 1) * nh];

        for (k, res) in row.iter().enumerate() {
            match res {
                Ok(Ok(v)) => writeln!(
                    writer_v,
                    "{:.6},{:.6},{:.16e},{},{},ok",
                    alpha,
                    h_dc[k],
                    v.velocity,
                    fmt_opt(v.velocity_stderr),
                    v.samples
                )?,
                Ok(Err(m)) => writeln!(writer_v, "{:.6},{:.6},,,,\"{}\"", alpha, h_dc[k], m)?,
                Err(e) => writeln!(writer_v, "{:.6},{:.6},,,,\"integration failed: {}\"", alpha, h_dc[k], e)?,
            }
        }

        // A failed integration is a missing velocity for the mobility fit.
        let measured: Vec<Result<VelocityFit, Missing>> = row
            .iter()
            .map(|r| r.clone().unwrap_or(Err(Missing::FitFailure)))
            .collect();

        match fit_mobility(&h_dc, &measured, cfg.analysis.mobility_weighting) {
            Ok(mu) => {
                log::info!(
                    "alpha={:.3}: mu={:+.4} v_int={:+.5} ({} points)",
                    alpha,
                    mu.mobility,
                    mu.intrinsic_velocity,
                    mu.points
                );
                writeln!(
                    writer_mu,
                    "{:.6},{:.16e},{},{:.16e},{},{},ok",
                    alpha,
                    mu.mobility,
                    fmt_opt(mu.mobility_stderr),
                    mu.intrinsic_velocity,
                    fmt_opt(mu.intrinsic_velocity_stderr),
                    mu.points
                )?;
            }
            Err(m) => {
                log::warn!("alpha={:.3}: no mobility ({m})", alpha);
                writeln!(writer_mu, "{:.6},,,,,,\"{}\"", alpha, m)?;
            }
        }
    }
    writer_v.flush()?;
    writer_mu.flush()?;

    log::info!(
        "mobility scan written to {} in {:.1} s",
        out_dir.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
