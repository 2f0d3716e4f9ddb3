// src/main.rs
//
// Single soliton run: nucleate a soliton with a Gaussian pulse on a chain
// prepared in the metastable +z state (or a relaxed ground state), integrate
// the LLG equation, track the core and fit its velocity.
//
// Sweeps live in dedicated executables under `src/bin/*`.
//
// Examples:
//
//   cargo run --release
//       -> default run: N=200, J=1, D=0.25, Da=-0.10, alpha=0.05, t in [0, 200)
//
//   cargo run --release -- alpha=0.1 hdc=0.01 out=runs run=alpha0p1
//       -> same pulse plus a static bias along z
//
//   RUST_LOG=debug cargo run --release -- init=ground seed=7
//       -> start from a relaxed ground state, log solver checkpoints
//
// Output (per run directory):
//   runs/<run_id>/
//     ├── config.json
//     ├── trajectory.json      (S_history 3N x T, time_points T)
//     └── core_track.csv       (t, core position; samples with a core only)

use std::env;
use std::error::Error;
use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use soliton_chain::chain::ChainField;
use soliton_chain::config::RunConfig;
use soliton_chain::external_field::{ExternalField, GaussianPulse};
use soliton_chain::ground_state::{GroundStateSettings, find_ground_state};
use soliton_chain::kinematics::{extract_velocity, track_core};
use soliton_chain::llg::{integrate_llg, sample_times};
use soliton_chain::phase::diagnose;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitKind {
    /// All spins along +z (metastable for Da < 0).
    Uniform,
    /// Relaxed from a random seed.
    Ground,
}

impl InitKind {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "uniform" | "fm" => Some(Self::Uniform),
            "ground" | "relaxed" => Some(Self::Ground),
            _ => None,
        }
    }
}

fn print_usage() {
    eprintln!(
        r#"Usage:
  cargo run -- [n=N] [j=VAL] [d=VAL] [da=VAL] [alpha=VAL] [gamma=VAL]
               [h0=VAL] [pulse=on|off] [hdc=VAL]
               [tmax=VAL] [dt=VAL] [rtol=VAL] [atol=VAL]
               [tfit0=VAL] [tfit1=VAL]
               [init=uniform|ground] [seed=N]
               [out=DIR] [run=RUN_ID]

Notes:
  - d and da are absolute couplings (not ratios to j).
  - Output samples are taken at 0, dt, 2dt, ... strictly below tmax.
  - Logging level follows RUST_LOG (default: info).
"#
    );
}

fn sanitize_run_id(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn default_run_id(alpha: f64, h_dc: f64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| std::time::Duration::from_secs(0));
    let ts = format!("{}{:03}", now.as_secs(), now.subsec_millis());
    format!("{}_a{:.3}_h{:.3}", ts, alpha, h_dc)
}

fn unique_run_dir(out_root: &str, run_id: &str) -> PathBuf {
    let base = PathBuf::from(out_root);
    let mut dir = base.join(run_id);
    if !dir.exists() {
        return dir;
    }
    for k in 1..1000 {
        let cand = base.join(format!("{}_{}", run_id, k));
        if !cand.exists() {
            dir = cand;
            break;
        }
    }
    dir
}

fn parse_f64(key: &str, v: &str) -> Option<f64> {
    let parsed = v.trim().parse::<f64>().ok();
    if parsed.is_none() {
        log::warn!("could not parse {key} value '{v}', ignoring");
    }
    parsed
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut cfg = RunConfig::soliton_default("soliton-chain", "");
    let mut init = InitKind::Uniform;
    let mut pulse_on = true;
    let mut h0_override: Option<f64> = None;
    let mut seed: Option<u64> = None;
    let mut out_root_override: Option<String> = None;
    let mut run_id_override: Option<String> = None;

    for arg in env::args().skip(1) {
        if arg == "-h" || arg == "--help" || arg == "help" {
            print_usage();
            return Ok(());
        }

        let Some((key, v)) = arg.split_once('=') else {
            log::warn!("ignoring unknown argument '{arg}'");
            continue;
        };

        match key {
            "n" => match v.parse::<usize>() {
                Ok(n) => cfg.chain.n_sites = n,
                Err(_) => log::warn!("could not parse n value '{v}', ignoring"),
            },
            "j" => cfg.coupling.j = parse_f64(key, v).unwrap_or(cfg.coupling.j),
            "d" => cfg.coupling.d = parse_f64(key, v).unwrap_or(cfg.coupling.d),
            "da" => cfg.coupling.da = parse_f64(key, v).unwrap_or(cfg.coupling.da),
            "alpha" => cfg.llg.alpha = parse_f64(key, v).unwrap_or(cfg.llg.alpha),
            "gamma" => cfg.llg.gamma = parse_f64(key, v).unwrap_or(cfg.llg.gamma),
            "h0" => h0_override = parse_f64(key, v),
            "hdc" => {
                if let Some(h) = parse_f64(key, v) {
                    cfg.fields.bias.field = [0.0, 0.0, h];
                }
            }
            "pulse" => {
                pulse_on = !(v.eq_ignore_ascii_case("off") || v == "0" || v.eq_ignore_ascii_case("false"));
            }
            "tmax" => cfg.numerics.t_max = parse_f64(key, v).unwrap_or(cfg.numerics.t_max),
            "dt" => cfg.numerics.dt_save = parse_f64(key, v).unwrap_or(cfg.numerics.dt_save),
            "rtol" => cfg.numerics.rk45.rtol = parse_f64(key, v).unwrap_or(cfg.numerics.rk45.rtol),
            "atol" => cfg.numerics.rk45.atol = parse_f64(key, v).unwrap_or(cfg.numerics.rk45.atol),
            "tfit0" => {
                cfg.analysis.fit_window.t_start =
                    parse_f64(key, v).unwrap_or(cfg.analysis.fit_window.t_start)
            }
            "tfit1" => {
                cfg.analysis.fit_window.t_end =
                    parse_f64(key, v).unwrap_or(cfg.analysis.fit_window.t_end)
            }
            "init" => {
                init = InitKind::from_str(v).unwrap_or_else(|| {
                    log::warn!("unknown init '{v}', using uniform");
                    InitKind::Uniform
                })
            }
            "seed" => seed = v.parse::<u64>().ok(),
            "out" => out_root_override = Some(v.to_string()),
            "run" => run_id_override = Some(v.to_string()),
            _ => log::warn!("ignoring unknown argument '{arg}'"),
        }
    }

    // The pulse follows the final chain length and exchange unless h0 is given.
    let n = cfg.chain.n_sites;
    cfg.fields.pulse = if pulse_on {
        let mut p = GaussianPulse::nucleation(n, cfg.coupling.j);
        if let Some(h0) = h0_override {
            p.amplitude = h0;
        }
        Some(p)
    } else {
        None
    };

    // -------- output directory setup --------
    let out_root = out_root_override.unwrap_or_else(|| "runs".to_string());
    create_dir_all(&out_root)?;
    let run_id = sanitize_run_id(
        &run_id_override.unwrap_or_else(|| default_run_id(cfg.llg.alpha, cfg.fields.bias.field[2])),
    );
    let run_dir = unique_run_dir(&out_root, &run_id);
    create_dir_all(&run_dir)?;
    cfg.run.run_id = run_id;

    // -------- initial state --------
    let coupling = cfg.coupling;
    let initial = match init {
        InitKind::Uniform => ChainField::new(n),
        InitKind::Ground => {
            let settings = GroundStateSettings {
                seed,
                ..GroundStateSettings::default()
            };
            let (m, report) = find_ground_state(n, &coupling, &settings)?;
            let diag = diagnose(&m);
            log::info!(
                "ground state: phase={} <Sz>={:+.4} std(Sz)={:.4} steps={} converged={}",
                diag.phase,
                diag.mean_z,
                diag.std_z,
                report.steps,
                report.converged
            );
            cfg.numerics.ground_state = Some(GroundStateSettings {
                seed: report.seed,
                ..settings
            });
            m
        }
    };

    cfg.write_to_dir(&run_dir)?;

    log::info!(
        "run {}: N={} J={} D={} Da={} alpha={} gamma={} h_dc={} t_max={} dt={}",
        cfg.run.run_id,
        n,
        coupling.j,
        coupling.d,
        coupling.da,
        cfg.llg.alpha,
        cfg.llg.gamma,
        cfg.fields.bias.field[2],
        cfg.numerics.t_max,
        cfg.numerics.dt_save
    );

    // -------- dynamics --------
    let t_eval = sample_times(0.0, cfg.numerics.t_max, cfg.numerics.dt_save);
    let t_span = (0.0, cfg.numerics.t_max);
    let started = Instant::now();

    let (traj, report) = match cfg.fields.pulse {
        Some(pulse) => {
            let field = pulse.plus(cfg.fields.bias);
            integrate_llg(&initial, &coupling, &cfg.llg, &field, t_span, &t_eval, &cfg.numerics.rk45)?
        }
        None => integrate_llg(
            &initial,
            &coupling,
            &cfg.llg,
            &cfg.fields.bias,
            t_span,
            &t_eval,
            &cfg.numerics.rk45,
        )?,
    };

    log::info!(
        "integrated {} samples in {:.1} s ({} accepted, {} rejected steps)",
        traj.len(),
        started.elapsed().as_secs_f64(),
        report.accepted_steps,
        report.rejected_steps
    );

    traj.write_json(&run_dir.join("trajectory.json"))?;

    // -------- kinematics --------
    let file_track = File::create(run_dir.join("core_track.csv"))?;
    let mut writer_track = BufWriter::new(file_track);
    writeln!(writer_track, "t,core_position")?;

    match track_core(&traj, cfg.analysis.core_threshold) {
        Ok(track) => {
            for (t, x) in track.times.iter().zip(track.positions.iter()) {
                writeln!(writer_track, "{:.16e},{:.16e}", t, x)?;
            }
            match extract_velocity(&track, &cfg.analysis.fit_window) {
                Ok(v) => log::info!(
                    "velocity = {:+.6} ± {} sites/time ({} samples in ({}, {}))",
                    v.velocity,
                    v.velocity_stderr
                        .map_or_else(|| "n/a".to_string(), |e| format!("{:.2e}", e)),
                    v.samples,
                    cfg.analysis.fit_window.t_start,
                    cfg.analysis.fit_window.t_end
                ),
                Err(e) => log::warn!("no velocity: {e}"),
            }
        }
        Err(e) => log::warn!("{e}"),
    }
    writer_track.flush()?;

    log::info!("outputs written to {}", run_dir.display());
    Ok(())
}
